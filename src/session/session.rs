use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::backend::{Metadata, SimpleUploadRequest, StoredFile, UploadBackend};
use crate::chunk::{plan, ChunkDescriptor, ChunkStatus, FileHasher, FileId};
use crate::metrics::{record_direct_upload, SessionMetrics};
use crate::progress::{EventSink, UploadEvent, UploadEvents, UploadStage};
use crate::resume::ResumeNegotiator;
use crate::scheduler::{ChunkTable, SchedulerOutcome, UploadContext, UploadScheduler};
use crate::session::config::UploadConfig;
use crate::session::error::{UploadError, UploadResult};
use crate::session::finalizer::Finalizer;
use crate::session::shared::SessionCore;
use crate::session::state_machine::{LifecycleEvent, UploadState};
use crate::session::types::{RunOutcome, UploadHandle};
use crate::source::UploadSource;

/// A single upload of one source to one backend.
///
/// All operations take `&self`, so a session can be shared (for example in
/// an `Arc`) between the task driving it and tasks that pause or inspect
/// it. Only one run is active at a time; `start` or `resume` while a run is
/// in progress return [`RunOutcome::AlreadyRunning`].
pub struct UploadSession<S, B> {
    core: Arc<SessionCore>,
    created_at: DateTime<Utc>,
    source: S,
    backend: B,
    config: UploadConfig,
    metadata: Metadata,
    context: Mutex<Option<UploadContext>>,
    stored: Mutex<Option<StoredFile>>,
}

impl<S: UploadSource, B: UploadBackend> UploadSession<S, B> {
    /// Create a session and the stream its events are delivered on.
    pub fn new(source: S, backend: B, config: UploadConfig) -> UploadResult<(Self, UploadEvents)> {
        config.validate()?;
        let (events, receiver) = EventSink::channel();

        let session = Self {
            core: Arc::new(SessionCore::new(uuid::Uuid::new_v4().to_string(), events)),
            created_at: Utc::now(),
            source,
            backend,
            config,
            metadata: Metadata::new(),
            context: Mutex::new(None),
            stored: Mutex::new(None),
        };

        tracing::debug!(
            "Created upload session {} for {} ({} bytes)",
            session.core.id,
            session.source.name(),
            session.source.size()
        );

        Ok((session, receiver))
    }

    /// Extra fields sent with the merge or direct-upload request.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.core.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> UploadState {
        self.core.lifecycle.current_state()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn handle(&self) -> UploadHandle {
        UploadHandle::new(self.core.clone())
    }

    /// Content hash, known once hashing has finished.
    pub fn file_id(&self) -> Option<FileId> {
        self.context.lock().as_ref().map(|c| c.file_id.clone())
    }

    pub fn chunks(&self) -> Vec<ChunkDescriptor> {
        self.core.table.lock().chunks().to_vec()
    }

    pub fn chunk_statuses(&self) -> BTreeMap<u32, ChunkStatus> {
        self.core.table.lock().statuses()
    }

    pub fn bytes_confirmed(&self) -> u64 {
        self.core.table.lock().bytes_confirmed()
    }

    /// The server's answer once the upload has completed.
    pub fn stored_file(&self) -> Option<StoredFile> {
        self.stored.lock().clone()
    }

    /// Run the upload from the beginning.
    ///
    /// Sources at or below `chunk_threshold` bytes go up in one direct
    /// request. Larger ones are hashed, planned, checked against the server
    /// and uploaded in batches, then merged.
    pub async fn start(&self) -> UploadResult<RunOutcome> {
        let Some(_guard) = self.core.try_run() else {
            tracing::warn!("Upload session {} is already running", self.core.id);
            return Ok(RunOutcome::AlreadyRunning);
        };
        self.ensure_not_terminal("start")?;
        self.run_from_start().await
    }

    /// Continue a paused or failed upload.
    ///
    /// The scheduler picks up the chunks that are not yet confirmed; when
    /// all of them are, only the merge is sent again. A session that never
    /// got as far as planning is started from the beginning.
    pub async fn resume(&self) -> UploadResult<RunOutcome> {
        let Some(_guard) = self.core.try_run() else {
            tracing::warn!("Upload session {} is already running", self.core.id);
            return Ok(RunOutcome::AlreadyRunning);
        };
        self.ensure_not_terminal("resume")?;

        let state = self.state();
        let context = self.context.lock().clone();
        match context {
            Some(context) if state.is_resumable() => {
                if self.core.control.is_cancelled() {
                    return self.finish(Ok(RunOutcome::Cancelled), SessionMetrics::start());
                }
                self.core.control.clear_pause();
                let metrics = SessionMetrics::start();
                tracing::info!("Resuming upload of {} from {}", context.file_name, state);
                let result = self.resume_chunked(&context).await;
                self.finish(result, metrics)
            }
            _ => self.run_from_start().await,
        }
    }

    /// Retry only the merge of a failed upload whose chunks are all stored.
    pub async fn retry_merge(&self) -> UploadResult<RunOutcome> {
        let Some(_guard) = self.core.try_run() else {
            return Ok(RunOutcome::AlreadyRunning);
        };

        let state = self.state();
        let context = self.context.lock().clone();
        let Some(context) = context.filter(|_| matches!(state, UploadState::Failed { .. })) else {
            return Err(UploadError::InvalidState(format!(
                "cannot retry the merge of a {state} upload"
            )));
        };

        let metrics = SessionMetrics::start();
        let result = self.merge(&context).await;
        self.finish(result, metrics)
    }

    /// Ask the running upload to stop after the current batch.
    ///
    /// Has no effect on an idle session.
    pub fn pause(&self) {
        self.core.pause();
    }

    /// Stop the upload and drop all chunk bookkeeping.
    ///
    /// A running upload stops at its next batch boundary; an idle one is
    /// cancelled immediately. Chunks already on the server stay there.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    fn ensure_not_terminal(&self, operation: &str) -> UploadResult<()> {
        let state = self.state();
        if state.is_terminal() {
            return Err(UploadError::InvalidState(format!(
                "cannot {operation} a {state} upload"
            )));
        }
        Ok(())
    }

    async fn run_from_start(&self) -> UploadResult<RunOutcome> {
        let metrics = SessionMetrics::start();
        if self.core.control.is_cancelled() {
            return self.finish(Ok(RunOutcome::Cancelled), metrics);
        }
        self.core.control.clear_pause();

        let result = if self.source.size() <= self.config.chunk_threshold {
            self.run_direct().await
        } else {
            self.run_chunked().await
        };
        self.finish(result, metrics)
    }

    async fn run_direct(&self) -> UploadResult<RunOutcome> {
        let size = self.source.size();
        self.core.lifecycle.transition(LifecycleEvent::StartDirect)?;
        tracing::info!(
            "Uploading {} ({} bytes) in a single request",
            self.source.name(),
            size
        );
        self.core.events.stage(UploadStage::Uploading, 0, size);

        let file = self.source.read_range(0, size as usize).await?;
        let request = SimpleUploadRequest {
            file,
            file_name: self.source.name().to_string(),
            metadata: self.metadata.clone(),
        };

        let timeout = self.config.simple_timeout();
        let upload = self.backend.simple_upload(request);
        let stored = match tokio::time::timeout(timeout, upload).await {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                record_direct_upload(size, false);
                return Err(UploadError::DirectUpload(e));
            }
            Err(_) => {
                record_direct_upload(size, false);
                return Err(UploadError::DirectUploadTimeout(timeout));
            }
        };

        record_direct_upload(size, true);
        self.core.events.stage(UploadStage::Completed, size, size);
        Ok(RunOutcome::Completed(stored))
    }

    async fn run_chunked(&self) -> UploadResult<RunOutcome> {
        let size = self.source.size();
        let name = self.source.name().to_string();

        self.core.lifecycle.transition(LifecycleEvent::Start)?;
        self.core.events.stage(UploadStage::Hashing, 0, size);
        let file_id = FileHasher::new(self.config.hash_window)
            .hash(&self.source)
            .await?;
        tracing::debug!("Hashed {} as {}", name, file_id);
        if self.core.control.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.core.lifecycle.transition(LifecycleEvent::Hashed)?;
        self.core.events.stage(UploadStage::Chunking, 0, size);
        let chunks = plan(&file_id, size, self.config.chunk_size)?;
        let context = UploadContext {
            file_id,
            file_name: name,
            file_size: size,
            total_chunks: chunks.len() as u32,
        };
        *self.core.table.lock() = ChunkTable::new(chunks);
        *self.context.lock() = Some(context.clone());
        if self.core.control.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.core.lifecycle.transition(LifecycleEvent::Negotiate)?;
        self.core.events.stage(UploadStage::Checking, 0, size);
        let negotiation = ResumeNegotiator::negotiate(
            &self.backend,
            &context.file_id,
            &context.file_name,
            context.total_chunks,
        )
        .await;
        if negotiation.is_fresh() {
            tracing::debug!("No chunks of {} stored yet", context.file_name);
        } else {
            tracing::info!(
                "Server already holds {}/{} chunks of {}",
                negotiation.confirmed.len(),
                context.total_chunks,
                context.file_name
            );
        }
        if let Some(warning) = negotiation.warning {
            self.core.events.warning(warning);
        }
        let confirmed = {
            let mut table = self.core.table.lock();
            table.apply_confirmed(&negotiation.confirmed);
            table.bytes_confirmed()
        };
        if self.core.control.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.core.lifecycle.transition(LifecycleEvent::Upload)?;
        self.core.events.stage(UploadStage::Uploading, confirmed, size);
        self.upload_and_merge(&context).await
    }

    async fn resume_chunked(&self, context: &UploadContext) -> UploadResult<RunOutcome> {
        self.core.lifecycle.transition(LifecycleEvent::Resume)?;
        self.core.events.stage(UploadStage::Uploading, self.bytes_confirmed(), context.file_size);
        self.upload_and_merge(context).await
    }

    async fn upload_and_merge(&self, context: &UploadContext) -> UploadResult<RunOutcome> {
        let outcome = UploadScheduler::new(
            &self.source,
            &self.backend,
            context,
            &self.core.control,
            &self.core.events,
            self.config.scheduler_config(),
        )
        .run(&self.core.table)
        .await?;

        match outcome {
            SchedulerOutcome::Paused => return Ok(RunOutcome::Paused),
            SchedulerOutcome::Cancelled => return Ok(RunOutcome::Cancelled),
            SchedulerOutcome::Completed => {}
        }
        if self.core.control.is_cancelled() {
            return Ok(RunOutcome::Cancelled);
        }

        self.merge(context).await
    }

    async fn merge(&self, context: &UploadContext) -> UploadResult<RunOutcome> {
        self.core.lifecycle.transition(LifecycleEvent::Merge)?;
        self.core.events.stage(UploadStage::Merging, self.bytes_confirmed(), context.file_size);

        let stored =
            Finalizer::finalize(&self.backend, context, &self.core.table, &self.metadata).await?;

        self.core.events.stage(UploadStage::Completed, context.file_size, context.file_size);
        Ok(RunOutcome::Completed(stored))
    }

    /// Settle the lifecycle, events and metrics for the end of a run.
    fn finish(
        &self,
        result: UploadResult<RunOutcome>,
        metrics: SessionMetrics,
    ) -> UploadResult<RunOutcome> {
        match result {
            Ok(RunOutcome::Completed(stored)) => {
                metrics.complete();
                self.core.lifecycle.transition(LifecycleEvent::Complete)?;
                tracing::info!(
                    "Upload of {} completed as {}",
                    self.source.name(),
                    stored.reference
                );
                *self.stored.lock() = Some(stored.clone());
                self.core.events.completed(stored.clone());
                Ok(RunOutcome::Completed(stored))
            }
            Ok(RunOutcome::Paused) => {
                metrics.suspend();
                self.core.lifecycle.transition(LifecycleEvent::Pause)?;
                tracing::info!(
                    "Upload of {} paused with {}/{} bytes confirmed",
                    self.source.name(),
                    self.bytes_confirmed(),
                    self.source.size()
                );
                self.core.events.emit(UploadEvent::Paused);
                Ok(RunOutcome::Paused)
            }
            Ok(RunOutcome::Cancelled) => {
                metrics.cancel();
                self.core.table.lock().clear();
                self.core.lifecycle.transition(LifecycleEvent::Cancel)?;
                tracing::info!("Upload of {} cancelled", self.source.name());
                self.core.events.emit(UploadEvent::Cancelled);
                Ok(RunOutcome::Cancelled)
            }
            Ok(RunOutcome::AlreadyRunning) => {
                metrics.suspend();
                Ok(RunOutcome::AlreadyRunning)
            }
            Err(e) => {
                metrics.fail(e.kind());
                tracing::error!("Upload of {} failed: {}", self.source.name(), e);
                self.core.lifecycle.transition(LifecycleEvent::Fail(e.to_string()))?;
                self.core.events.failed(&e);
                Err(e)
            }
        }
    }
}

/// Upload `source` start to finish and return the server's answer.
///
/// Events are discarded. Use [`UploadSession`] directly to observe
/// progress or to pause and resume.
pub async fn smart_upload<S: UploadSource, B: UploadBackend>(
    source: S,
    backend: B,
    config: UploadConfig,
    metadata: Metadata,
) -> UploadResult<StoredFile> {
    let (session, _events) = UploadSession::new(source, backend, config)?;
    let session = session.with_metadata(metadata);

    match session.start().await? {
        RunOutcome::Completed(stored) => Ok(stored),
        other => Err(UploadError::InvalidState(format!(
            "upload stopped without completing: {other:?}"
        ))),
    }
}
