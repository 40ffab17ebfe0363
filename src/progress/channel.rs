use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::types::{UploadEvent, UploadProgress, UploadStage};
use crate::backend::StoredFile;
use crate::chunk::ChunkDescriptor;

/// Sending half, owned by the session.
///
/// Sends never fail from the caller's point of view: once the receiver is
/// dropped, events are discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, UploadEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, UploadEvents { rx })
    }

    pub fn emit(&self, event: UploadEvent) {
        let _ = self.tx.send(event);
    }

    pub fn progress(&self, progress: UploadProgress) {
        self.emit(UploadEvent::Progress(progress));
    }

    pub fn stage(&self, stage: UploadStage, loaded: u64, total: u64) {
        self.progress(UploadProgress::stage(stage, loaded, total));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(UploadEvent::Warning(message.into()));
    }

    pub fn chunk_failed(&self, error: &impl std::fmt::Display, chunk: &ChunkDescriptor) {
        self.emit(UploadEvent::ChunkFailed {
            error: error.to_string(),
            chunk: chunk.clone(),
        });
    }

    pub fn completed(&self, file: StoredFile) {
        self.emit(UploadEvent::Completed(file));
    }

    pub fn failed(&self, error: &impl std::fmt::Display) {
        self.emit(UploadEvent::Failed(error.to_string()));
    }
}

/// Receiving half handed to the caller.
///
/// One stream spans every run of a session. It ends only once the session
/// and all of its handles are dropped, so a caller waiting on a single run
/// should stop at that run's outcome, see [`UploadEvents::until_outcome`].
#[derive(Debug)]
pub struct UploadEvents {
    rx: mpsc::UnboundedReceiver<UploadEvent>,
}

impl UploadEvents {
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        self.rx.recv().await
    }

    /// Collect events up to and including the next run outcome (completed,
    /// paused, cancelled or failed), or until the stream ends.
    pub async fn until_outcome(&mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            let done = event.is_run_outcome();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    /// Everything already queued, without waiting.
    pub fn drain(&mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for UploadEvents {
    type Item = UploadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
