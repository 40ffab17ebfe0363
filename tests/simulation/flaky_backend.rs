//! Unreliable upload server for in-process stress testing
//!
//! Wraps a `MemoryBackend` and randomly drops chunk uploads, delays
//! requests and fails merges, the way a bad mobile link would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chunkstream_upload::backend::{
    BackendError, BackendResult, CheckChunksRequest, CheckChunksResponse, ChunkUploadRequest,
    MemoryBackend, MergeRequest, SimpleUploadRequest, StoredFile, UploadBackend,
};
use rand::Rng;
use tokio::time::sleep;

/// How unreliable the simulated server is
#[derive(Debug, Clone)]
pub struct FlakyConfig {
    /// Chance a chunk upload is rejected (0.0 - 1.0)
    pub chunk_failure_rate: f64,
    /// Chance the check-chunks request fails (0.0 - 1.0)
    pub check_failure_rate: f64,
    /// Chance a merge request fails (0.0 - 1.0)
    pub merge_failure_rate: f64,
    /// Base latency per request in milliseconds
    pub latency_ms: u64,
    /// Random extra latency in milliseconds
    pub jitter_ms: u64,
}

impl Default for FlakyConfig {
    fn default() -> Self {
        Self {
            chunk_failure_rate: 0.0,
            check_failure_rate: 0.0,
            merge_failure_rate: 0.0,
            latency_ms: 0,
            jitter_ms: 0,
        }
    }
}

impl FlakyConfig {
    pub fn reliable() -> Self {
        Self::default()
    }

    /// Occasional drops and a few milliseconds of latency
    pub fn wifi() -> Self {
        Self {
            chunk_failure_rate: 0.05,
            check_failure_rate: 0.05,
            merge_failure_rate: 0.02,
            latency_ms: 2,
            jitter_ms: 3,
        }
    }

    /// One request in five fails
    pub fn degraded() -> Self {
        Self {
            chunk_failure_rate: 0.20,
            check_failure_rate: 0.20,
            merge_failure_rate: 0.10,
            latency_ms: 1,
            jitter_ms: 5,
        }
    }

    pub fn with_chunk_failures(rate: f64) -> Self {
        Self {
            chunk_failure_rate: rate,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct FlakyStats {
    pub chunk_requests: AtomicU64,
    pub chunks_dropped: AtomicU64,
    pub checks_failed: AtomicU64,
    pub merges_failed: AtomicU64,
}

impl FlakyStats {
    pub fn drop_rate(&self) -> f64 {
        let sent = self.chunk_requests.load(Ordering::Relaxed);
        let dropped = self.chunks_dropped.load(Ordering::Relaxed);
        if sent > 0 {
            dropped as f64 / sent as f64
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Chunk requests: {}, dropped: {} ({:.1}%), failed checks: {}, failed merges: {}",
            self.chunk_requests.load(Ordering::Relaxed),
            self.chunks_dropped.load(Ordering::Relaxed),
            self.drop_rate() * 100.0,
            self.checks_failed.load(Ordering::Relaxed),
            self.merges_failed.load(Ordering::Relaxed),
        )
    }
}

#[derive(Clone)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    config: FlakyConfig,
    stats: Arc<FlakyStats>,
}

impl FlakyBackend {
    pub fn new(config: FlakyConfig) -> Self {
        Self {
            inner: MemoryBackend::new(),
            config,
            stats: Arc::new(FlakyStats::default()),
        }
    }

    /// The reliable store behind the faults
    pub fn store(&self) -> &MemoryBackend {
        &self.inner
    }

    pub fn stats(&self) -> &FlakyStats {
        &self.stats
    }

    fn roll(rate: f64) -> bool {
        rate > 0.0 && rand::thread_rng().gen_bool(rate.min(1.0))
    }

    async fn delay(&self) {
        let jitter = if self.config.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        let total = self.config.latency_ms + jitter;
        if total > 0 {
            sleep(Duration::from_millis(total)).await;
        }
    }
}

impl UploadBackend for FlakyBackend {
    async fn check_chunks(
        &self,
        request: CheckChunksRequest,
    ) -> BackendResult<CheckChunksResponse> {
        self.delay().await;
        if Self::roll(self.config.check_failure_rate) {
            self.stats.checks_failed.fetch_add(1, Ordering::Relaxed);
            return Err(BackendError::Transport("connection reset".into()));
        }
        self.inner.check_chunks(request).await
    }

    async fn upload_chunk(&self, request: ChunkUploadRequest) -> BackendResult<()> {
        self.stats.chunk_requests.fetch_add(1, Ordering::Relaxed);
        self.delay().await;
        if Self::roll(self.config.chunk_failure_rate) {
            self.stats.chunks_dropped.fetch_add(1, Ordering::Relaxed);
            return Err(BackendError::Transport(format!(
                "chunk {} dropped",
                request.chunk_index
            )));
        }
        self.inner.upload_chunk(request).await
    }

    async fn merge_chunks(&self, request: MergeRequest) -> BackendResult<StoredFile> {
        self.delay().await;
        if Self::roll(self.config.merge_failure_rate) {
            self.stats.merges_failed.fetch_add(1, Ordering::Relaxed);
            return Err(BackendError::Transport("gateway timeout".into()));
        }
        self.inner.merge_chunks(request).await
    }

    async fn simple_upload(&self, request: SimpleUploadRequest) -> BackendResult<StoredFile> {
        self.delay().await;
        self.inner.simple_upload(request).await
    }
}
