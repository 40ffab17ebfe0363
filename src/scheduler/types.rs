use std::time::Duration;

use crate::chunk::FileId;

/// Identifies the file every chunk request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    pub file_id: FileId,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum chunk uploads in flight, and therefore the batch size.
    pub concurrency: usize,
    /// Per-request deadline; an expired request counts as a failed chunk.
    pub chunk_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            chunk_timeout: Duration::from_secs(30),
        }
    }
}

/// How a scheduling run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOutcome {
    /// Every chunk is confirmed.
    Completed,
    /// Stopped at a batch boundary; confirmed chunks are kept.
    Paused,
    /// Stopped at a batch boundary and the chunk table was cleared.
    Cancelled,
}
