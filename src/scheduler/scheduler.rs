use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;

use crate::backend::{ChunkUploadRequest, UploadBackend};
use crate::chunk::ChunkDescriptor;
use crate::metrics::{record_chunk_failed, record_chunk_uploaded};
use crate::progress::{EventSink, UploadProgress};
use crate::scheduler::control::UploadControl;
use crate::scheduler::error::{SchedulerError, SchedulerResult};
use crate::scheduler::table::ChunkTable;
use crate::scheduler::types::{SchedulerConfig, SchedulerOutcome, UploadContext};
use crate::source::UploadSource;

/// Uploads every unconfirmed chunk in sequential batches.
///
/// A batch holds at most `concurrency` chunks, launched in ascending index
/// order and polled together on the current task. The next batch starts
/// only after every upload in the current one has settled, so no more than
/// `concurrency` requests are ever outstanding. Pause and cancel are
/// honoured between batches.
pub struct UploadScheduler<'a, S, B> {
    source: &'a S,
    backend: &'a B,
    context: &'a UploadContext,
    control: &'a UploadControl,
    events: &'a EventSink,
    config: SchedulerConfig,
}

impl<'a, S: UploadSource, B: UploadBackend> UploadScheduler<'a, S, B> {
    pub fn new(
        source: &'a S,
        backend: &'a B,
        context: &'a UploadContext,
        control: &'a UploadControl,
        events: &'a EventSink,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            backend,
            context,
            control,
            events,
            config: SchedulerConfig {
                concurrency: config.concurrency.max(1),
                ..config
            },
        }
    }

    /// Run until every chunk in `table` is confirmed, a pause or cancel is
    /// observed at a batch boundary, or a batch contains a failure.
    ///
    /// Already confirmed chunks are skipped, which is what makes a second
    /// run after a pause (or a failure) resume where the first left off.
    pub async fn run(&self, table: &Mutex<ChunkTable>) -> SchedulerResult<SchedulerOutcome> {
        let pending = table.lock().pending();
        let batch_count = pending.len().div_ceil(self.config.concurrency);

        tracing::debug!(
            "Scheduling {} chunks of {} in {} batches",
            pending.len(),
            self.context.file_id,
            batch_count
        );

        for (batch_number, batch) in pending.chunks(self.config.concurrency).enumerate() {
            if self.control.is_cancelled() {
                table.lock().clear();
                tracing::info!("Upload of {} cancelled", self.context.file_id);
                return Ok(SchedulerOutcome::Cancelled);
            }
            if self.control.is_paused() {
                tracing::info!(
                    "Upload of {} paused before batch {}/{}",
                    self.context.file_id,
                    batch_number + 1,
                    batch_count
                );
                return Ok(SchedulerOutcome::Paused);
            }

            tracing::debug!(
                "Batch {}/{}: chunks {:?}",
                batch_number + 1,
                batch_count,
                batch.iter().map(|c| c.index).collect::<Vec<_>>()
            );
            self.run_batch(batch, table).await?;
        }

        Ok(SchedulerOutcome::Completed)
    }

    async fn run_batch(
        &self,
        batch: &[ChunkDescriptor],
        table: &Mutex<ChunkTable>,
    ) -> SchedulerResult<()> {
        {
            let mut table = table.lock();
            for chunk in batch {
                table.mark_in_flight(chunk.index);
            }
            debug_assert!(table.in_flight() <= self.config.concurrency);
        }

        let mut uploads: FuturesUnordered<_> =
            batch.iter().map(|chunk| self.upload_chunk(chunk)).collect();

        let mut first_error = None;
        while let Some((chunk, result)) = uploads.next().await {
            match result {
                Ok(()) => {
                    let confirmed = {
                        let mut table = table.lock();
                        table.mark_confirmed(chunk.index);
                        table.bytes_confirmed()
                    };
                    self.events.progress(UploadProgress::chunk(
                        confirmed,
                        self.context.file_size,
                        chunk.index,
                        self.context.total_chunks,
                    ));
                }
                Err(e) => {
                    table.lock().mark_failed(chunk.index);
                    tracing::warn!("{}", e);
                    record_chunk_failed(e.kind());
                    self.events.chunk_failed(&e, chunk);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn upload_chunk<'c>(
        &self,
        chunk: &'c ChunkDescriptor,
    ) -> (&'c ChunkDescriptor, SchedulerResult<()>) {
        let result = self.send(chunk).await;
        (chunk, result)
    }

    async fn send(&self, chunk: &ChunkDescriptor) -> SchedulerResult<()> {
        let index = chunk.index;
        let data = self
            .source
            .read_range(chunk.start, chunk.len())
            .await
            .map_err(|source| SchedulerError::Read { index, source })?;

        let request = ChunkUploadRequest {
            chunk: data,
            chunk_index: index,
            chunk_hash: chunk.key.clone(),
            file_hash: self.context.file_id.to_string(),
            file_name: self.context.file_name.clone(),
            total_chunks: self.context.total_chunks,
        };

        let started = Instant::now();
        let timeout = self.config.chunk_timeout;
        match tokio::time::timeout(timeout, self.backend.upload_chunk(request)).await {
            Ok(Ok(())) => {
                record_chunk_uploaded(chunk.size, started.elapsed());
                Ok(())
            }
            Ok(Err(source)) => Err(SchedulerError::ChunkUpload { index, source }),
            Err(_) => Err(SchedulerError::Timeout { index, timeout }),
        }
    }
}
