use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::chunk::ChunkError;
use crate::scheduler::SchedulerError;
use crate::session::config::ConfigError;
use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Read error: {0}")]
    Read(#[from] SourceError),

    #[error("Chunk planning error: {0}")]
    Plan(#[from] ChunkError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Merge failed: {0}")]
    Merge(#[source] BackendError),

    #[error("Direct upload failed: {0}")]
    DirectUpload(#[source] BackendError),

    #[error("Direct upload timed out after {0:?}")]
    DirectUploadTimeout(Duration),

    #[error("Cannot merge: {confirmed}/{total} chunks confirmed")]
    Incomplete { confirmed: usize, total: u32 },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl UploadError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Config(_) => "config",
            UploadError::Read(_) => "read",
            UploadError::Plan(_) => "plan",
            UploadError::Scheduler(e) => e.kind(),
            UploadError::Merge(_) => "merge",
            UploadError::DirectUpload(_) | UploadError::DirectUploadTimeout(_) => "direct",
            UploadError::Incomplete { .. } => "incomplete",
            UploadError::InvalidState(_) => "state",
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
