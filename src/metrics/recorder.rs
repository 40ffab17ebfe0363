//! Metrics recorder for upload sessions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "upload_sessions_started_total",
        "Total number of upload sessions started"
    );
    describe_counter!(
        "upload_sessions_completed_total",
        "Total number of upload sessions that merged successfully"
    );
    describe_counter!(
        "upload_sessions_failed_total",
        "Total number of upload sessions that failed"
    );
    describe_counter!(
        "upload_sessions_cancelled_total",
        "Total number of upload sessions cancelled by the caller"
    );

    describe_counter!("upload_chunks_total", "Total number of chunks confirmed by the server");
    describe_counter!(
        "upload_chunks_failed_total",
        "Total number of chunk uploads that failed or timed out"
    );
    describe_counter!("upload_bytes_total", "Total chunk bytes confirmed by the server");
    describe_counter!("upload_merges_total", "Total number of merge requests");
    describe_counter!(
        "upload_direct_total",
        "Total number of small files sent in a single request"
    );

    describe_gauge!("upload_active_sessions", "Number of upload sessions currently running");

    describe_histogram!(
        "upload_chunk_duration_seconds",
        "Round trip time for a single chunk upload"
    );
    describe_histogram!(
        "upload_session_duration_seconds",
        "Time from start to merge for a completed session"
    );
}

// ============== Chunk Operations ==============

/// Record a chunk confirmed by the server
pub fn record_chunk_uploaded(chunk_size: u64, duration: Duration) {
    counter!("upload_chunks_total").increment(1);
    counter!("upload_bytes_total").increment(chunk_size);
    histogram!("upload_chunk_duration_seconds").record(duration.as_secs_f64());
}

/// Record a chunk upload that failed
pub fn record_chunk_failed(reason: &str) {
    counter!("upload_chunks_failed_total", "reason" => reason.to_string()).increment(1);
}

// ============== Session Operations ==============

/// Record a merge request and its result
pub fn record_merge(success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!("upload_merges_total", "result" => result).increment(1);
}

/// Record a direct single-request upload
pub fn record_direct_upload(file_size: u64, success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!("upload_direct_total", "result" => result).increment(1);
    if success {
        counter!("upload_bytes_total").increment(file_size);
    }
}

/// Tracks one run of a session from start to its outcome
pub struct SessionMetrics {
    start_time: Instant,
}

impl SessionMetrics {
    pub fn start() -> Self {
        counter!("upload_sessions_started_total").increment(1);
        gauge!("upload_active_sessions").increment(1.0);

        Self {
            start_time: Instant::now(),
        }
    }

    pub fn complete(self) {
        counter!("upload_sessions_completed_total").increment(1);
        gauge!("upload_active_sessions").decrement(1.0);
        histogram!("upload_session_duration_seconds")
            .record(self.start_time.elapsed().as_secs_f64());
    }

    pub fn fail(self, reason: &str) {
        counter!("upload_sessions_failed_total", "reason" => reason.to_string()).increment(1);
        gauge!("upload_active_sessions").decrement(1.0);
    }

    pub fn cancel(self) {
        counter!("upload_sessions_cancelled_total").increment(1);
        gauge!("upload_active_sessions").decrement(1.0);
    }

    /// Run stopped without a terminal outcome (paused).
    pub fn suspend(self) {
        gauge!("upload_active_sessions").decrement(1.0);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_session_metrics_without_recorder() {
        let metrics = SessionMetrics::start();
        record_chunk_uploaded(1024, Duration::from_millis(5));
        record_chunk_failed("timeout");
        record_merge(true);
        assert!(metrics.elapsed() >= Duration::ZERO);
        metrics.complete();
    }
}
