//! One upload from start to finish.
//!
//! The session owns the lifecycle: hash, plan, negotiate, schedule and
//! merge for large files, or a single direct request for small ones.

pub mod config;
mod shared;
pub mod error;
pub mod finalizer;
pub mod session;
pub mod state_machine;
pub mod types;

pub use config::{ConfigError, UploadConfig};
pub use error::{UploadError, UploadResult};
pub use finalizer::Finalizer;
pub use session::{smart_upload, UploadSession};
pub use state_machine::{LifecycleEvent, UploadLifecycle, UploadState};
pub use types::{RunOutcome, UploadHandle};
