//! Resumable, chunked file uploads.
//!
//! A file is hashed into a content id, split into fixed-size chunks, checked
//! against what the server already holds, uploaded in bounded concurrent
//! batches and merged server-side. Small files go up in a single request.
//! Sessions can be paused, resumed and cancelled; progress arrives on an
//! event stream.

pub mod backend;
pub mod chunk;
pub mod metrics;
pub mod progress;
pub mod resume;
pub mod scheduler;
pub mod session;
pub mod source;

pub use backend::{MemoryBackend, Metadata, StoredFile, UploadBackend};
pub use chunk::{ChunkDescriptor, ChunkStatus, FileId};
pub use progress::{UploadEvent, UploadEvents, UploadProgress, UploadStage};
pub use session::{
    smart_upload, RunOutcome, UploadConfig, UploadError, UploadHandle, UploadResult,
    UploadSession, UploadState,
};
pub use source::{FileSource, MemorySource, UploadSource};
