use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Chunk {index} upload failed: {source}")]
    ChunkUpload {
        index: u32,
        #[source]
        source: BackendError,
    },

    #[error("Chunk {index} upload timed out after {timeout:?}")]
    Timeout { index: u32, timeout: Duration },

    #[error("Failed to read chunk {index}: {source}")]
    Read {
        index: u32,
        #[source]
        source: SourceError,
    },
}

impl SchedulerError {
    pub fn chunk_index(&self) -> u32 {
        match self {
            SchedulerError::ChunkUpload { index, .. }
            | SchedulerError::Timeout { index, .. }
            | SchedulerError::Read { index, .. } => *index,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::ChunkUpload { .. } => "upload",
            SchedulerError::Timeout { .. } => "timeout",
            SchedulerError::Read { .. } => "read",
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
