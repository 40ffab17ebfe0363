use std::sync::Arc;

use crate::backend::StoredFile;
use crate::session::shared::SessionCore;

/// How a call to `start`, `resume` or `retry_merge` ended without error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(StoredFile),
    /// Stopped at a batch boundary. Confirmed chunks are kept for `resume`.
    Paused,
    Cancelled,
    /// Another run of the same session is in progress; nothing was done.
    AlreadyRunning,
}

impl RunOutcome {
    pub fn stored_file(&self) -> Option<&StoredFile> {
        match self {
            RunOutcome::Completed(file) => Some(file),
            _ => None,
        }
    }
}

/// Pause and cancel a session from another task.
///
/// A pause is picked up by a running session at its next batch boundary
/// and ignored by an idle one. A cancel behaves like
/// `UploadSession::cancel`: a running session stops at its next batch or
/// stage boundary, an idle one is cancelled immediately.
#[derive(Debug, Clone)]
pub struct UploadHandle {
    core: Arc<SessionCore>,
}

impl UploadHandle {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        Self { core }
    }

    pub fn pause(&self) {
        self.core.pause();
    }

    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub fn is_paused(&self) -> bool {
        self.core.control.is_paused()
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.control.is_cancelled()
    }
}
