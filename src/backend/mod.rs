pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use memory::{BackendCall, MemoryBackend};
pub use traits::UploadBackend;
pub use types::{
    CheckChunksRequest, CheckChunksResponse, ChunkUploadRequest, MergeRequest, Metadata,
    SimpleUploadRequest, StoredFile,
};
