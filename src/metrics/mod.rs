//! Metrics for upload sessions
//!
//! Emitted through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder; call [`init_metrics`] once at
//! startup to register descriptions.
//!
//! Key metrics:
//! - Sessions started, completed, failed, cancelled
//! - Chunks uploaded and failed, bytes uploaded, per-chunk latency
//! - Merge requests and direct (single request) uploads

pub mod recorder;

pub use recorder::{
    init_metrics, record_chunk_failed, record_chunk_uploaded, record_direct_upload,
    record_merge, SessionMetrics,
};
