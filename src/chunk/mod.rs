pub mod error;
pub mod hasher;
pub mod planner;
pub mod types;

pub use error::{ChunkError, Result};
pub use hasher::{FileHasher, DEFAULT_HASH_WINDOW};
pub use planner::{chunk_count, chunk_key, plan};
pub use types::{ChunkDescriptor, ChunkStatus, FileId};
