//! In-process upload server for tests and local demos.
//!
//! Stores chunks in memory, concatenates them on merge and records every
//! call it receives. Faults (failing chunks, failing check/merge, latency)
//! can be injected to exercise the engine's error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use parking_lot::Mutex;

use super::error::{BackendError, BackendResult};
use super::traits::UploadBackend;
use super::types::{
    CheckChunksRequest, CheckChunksResponse, ChunkUploadRequest, MergeRequest,
    SimpleUploadRequest, StoredFile,
};

/// A call observed by the backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CheckChunks { file_hash: String, total_chunks: u32 },
    UploadChunk { file_hash: String, chunk_index: u32 },
    MergeChunks { file_hash: String, total_chunks: u32, file_size: u64 },
    SimpleUpload { file_name: String, size: u64 },
}

type ChunkHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Faults {
    /// Remaining forced failures per chunk index.
    failing_chunks: HashMap<u32, u32>,
    check_failures: u32,
    merge_failures: u32,
    simple_failures: u32,
    upload_delay: Option<Duration>,
    chunk_delays: HashMap<u32, Duration>,
    hooks: HashMap<u32, ChunkHook>,
}

#[derive(Default)]
struct Inner {
    // file_hash -> chunk index -> bytes
    chunks: DashMap<String, BTreeMap<u32, Bytes>>,
    // reference -> merged bytes
    files: DashMap<String, Bytes>,
    calls: Mutex<Vec<BackendCall>>,
    faults: Mutex<Faults>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Shared-state in-memory backend. Clones talk to the same store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the server already holds `indices` of `file_hash`.
    pub fn seed_chunks(&self, file_hash: &str, chunks: impl IntoIterator<Item = (u32, Bytes)>) {
        let mut stored = self.inner.chunks.entry(file_hash.to_string()).or_default();
        stored.extend(chunks);
    }

    /// Fail the next `times` uploads of chunk `index`.
    pub fn fail_chunk(&self, index: u32, times: u32) {
        self.inner.faults.lock().failing_chunks.insert(index, times);
    }

    pub fn fail_check(&self, times: u32) {
        self.inner.faults.lock().check_failures = times;
    }

    pub fn fail_merge(&self, times: u32) {
        self.inner.faults.lock().merge_failures = times;
    }

    pub fn fail_simple_upload(&self, times: u32) {
        self.inner.faults.lock().simple_failures = times;
    }

    /// Delay every chunk upload by `delay` before it is stored.
    pub fn set_upload_delay(&self, delay: Duration) {
        self.inner.faults.lock().upload_delay = Some(delay);
    }

    /// Delay chunk `index` by `delay`, overriding the global delay.
    pub fn set_chunk_delay(&self, index: u32, delay: Duration) {
        self.inner.faults.lock().chunk_delays.insert(index, delay);
    }

    /// Run `hook` when chunk `index` is stored, before the upload returns.
    pub fn on_chunk_stored(&self, index: u32, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.faults.lock().hooks.insert(index, Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.calls.lock().clone()
    }

    /// Chunk indices whose upload was attempted, in arrival order.
    pub fn uploaded_indices(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::UploadChunk { chunk_index, .. } => Some(chunk_index),
                _ => None,
            })
            .collect()
    }

    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.inner.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    /// Highest number of chunk uploads that were in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn stored_chunk_indices(&self, file_hash: &str) -> Vec<u32> {
        self.inner
            .chunks
            .get(file_hash)
            .map(|chunks| chunks.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Bytes of a merged or directly uploaded file.
    pub fn file(&self, reference: &str) -> Option<Bytes> {
        self.inner.files.get(reference).map(|bytes| bytes.clone())
    }

    fn record(&self, call: BackendCall) {
        self.inner.calls.lock().push(call);
    }

    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }

    fn reference(file_hash: &str, file_name: &str) -> String {
        format!("memory://{file_hash}/{file_name}")
    }
}

/// Decrements the in-flight counter even if the upload future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl UploadBackend for MemoryBackend {
    async fn check_chunks(
        &self,
        request: CheckChunksRequest,
    ) -> BackendResult<CheckChunksResponse> {
        self.record(BackendCall::CheckChunks {
            file_hash: request.file_hash.clone(),
            total_chunks: request.total_chunks,
        });

        if Self::take_failure(&mut self.inner.faults.lock().check_failures) {
            return Err(BackendError::Transport("check-chunks unavailable".into()));
        }

        Ok(CheckChunksResponse {
            uploaded_chunks: self.stored_chunk_indices(&request.file_hash),
        })
    }

    async fn upload_chunk(&self, request: ChunkUploadRequest) -> BackendResult<()> {
        self.record(BackendCall::UploadChunk {
            file_hash: request.file_hash.clone(),
            chunk_index: request.chunk_index,
        });

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.inner.in_flight);

        let (delay, fail, hook) = {
            let mut faults = self.inner.faults.lock();
            let delay = faults
                .chunk_delays
                .get(&request.chunk_index)
                .copied()
                .or(faults.upload_delay);
            let fail = faults
                .failing_chunks
                .get_mut(&request.chunk_index)
                .is_some_and(Self::take_failure);
            let hook = faults.hooks.get(&request.chunk_index).cloned();
            (delay, fail, hook)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(BackendError::Rejected(format!(
                "chunk {} rejected",
                request.chunk_index
            )));
        }

        self.inner
            .chunks
            .entry(request.file_hash)
            .or_default()
            .insert(request.chunk_index, request.chunk);

        if let Some(hook) = hook {
            hook();
        }

        Ok(())
    }

    async fn merge_chunks(&self, request: MergeRequest) -> BackendResult<StoredFile> {
        self.record(BackendCall::MergeChunks {
            file_hash: request.file_hash.clone(),
            total_chunks: request.total_chunks,
            file_size: request.file_size,
        });

        if Self::take_failure(&mut self.inner.faults.lock().merge_failures) {
            return Err(BackendError::Transport("merge-chunks unavailable".into()));
        }

        let merged = {
            let empty = BTreeMap::new();
            let stored = self.inner.chunks.get(&request.file_hash);
            let chunks = stored.as_deref().unwrap_or(&empty);

            let missing: Vec<u32> = (0..request.total_chunks)
                .filter(|index| !chunks.contains_key(index))
                .collect();
            if !missing.is_empty() {
                return Err(BackendError::MissingChunks {
                    file_hash: request.file_hash,
                    missing,
                });
            }

            let mut merged = BytesMut::with_capacity(request.file_size as usize);
            for index in 0..request.total_chunks {
                merged.extend_from_slice(&chunks[&index]);
            }
            merged.freeze()
        };

        if merged.len() as u64 != request.file_size {
            return Err(BackendError::SizeMismatch {
                expected: request.file_size,
                actual: merged.len() as u64,
            });
        }

        let reference = Self::reference(&request.file_hash, &request.file_name);
        self.inner.files.insert(reference.clone(), merged);

        Ok(StoredFile {
            reference,
            file_name: Some(request.file_name),
            file_size: Some(request.file_size),
            extra: request.metadata,
        })
    }

    async fn simple_upload(&self, request: SimpleUploadRequest) -> BackendResult<StoredFile> {
        let size = request.file.len() as u64;
        self.record(BackendCall::SimpleUpload {
            file_name: request.file_name.clone(),
            size,
        });

        if Self::take_failure(&mut self.inner.faults.lock().simple_failures) {
            return Err(BackendError::Transport("upload unavailable".into()));
        }

        let reference = format!("memory://direct/{}/{}", uuid::Uuid::new_v4(), request.file_name);
        self.inner.files.insert(reference.clone(), request.file);

        Ok(StoredFile {
            reference,
            file_name: Some(request.file_name),
            file_size: Some(size),
            extra: request.metadata,
        })
    }
}
