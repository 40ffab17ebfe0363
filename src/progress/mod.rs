//! Progress and outcome notifications for an upload.
//!
//! Callers consume a finite [`UploadEvents`] stream instead of registering
//! progress, error and success callbacks.

pub mod channel;
pub mod types;

pub use channel::{EventSink, UploadEvents};
pub use types::{UploadEvent, UploadProgress, UploadStage};
