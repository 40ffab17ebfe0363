//! Batched, bounded-concurrency chunk uploads.

pub mod control;
pub mod error;
pub mod scheduler;
pub mod table;
pub mod types;

pub use control::UploadControl;
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::UploadScheduler;
pub use table::ChunkTable;
pub use types::{SchedulerConfig, SchedulerOutcome, UploadContext};
