use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::progress::{EventSink, UploadEvent};
use crate::scheduler::{ChunkTable, UploadControl};
use crate::session::state_machine::{LifecycleEvent, UploadLifecycle};

/// Clears the running flag when a run ends, however it ends.
pub(crate) struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The part of a session that handles can act on from other tasks.
#[derive(Debug)]
pub(crate) struct SessionCore {
    pub(crate) id: String,
    pub(crate) control: UploadControl,
    pub(crate) lifecycle: UploadLifecycle,
    pub(crate) table: Mutex<ChunkTable>,
    pub(crate) events: EventSink,
    running: AtomicBool,
}

impl SessionCore {
    pub(crate) fn new(id: String, events: EventSink) -> Self {
        Self {
            id,
            control: UploadControl::new(),
            lifecycle: UploadLifecycle::new(),
            table: Mutex::new(ChunkTable::default()),
            events,
            running: AtomicBool::new(false),
        }
    }

    /// `None` while another run holds the session.
    pub(crate) fn try_run(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard(&self.running))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn pause(&self) {
        if self.is_running() {
            tracing::info!("Pause requested for upload session {}", self.id);
            self.control.request_pause();
        }
    }

    /// Flag the cancel for a running upload, or cancel an idle one on the
    /// spot: clear the chunk table, move to Cancelled and report it.
    pub(crate) fn cancel(&self) {
        self.control.request_cancel();

        let Some(_guard) = self.try_run() else {
            return;
        };
        if self.lifecycle.current_state().is_terminal() {
            return;
        }
        self.table.lock().clear();
        if self.lifecycle.transition(LifecycleEvent::Cancel).is_ok() {
            tracing::info!("Upload session {} cancelled", self.id);
            self.events.emit(UploadEvent::Cancelled);
        }
    }
}
