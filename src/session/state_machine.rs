use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::session::error::{UploadError, UploadResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    Created,
    Hashing,
    Chunked,
    Negotiating,
    Uploading,
    Paused,
    Merging,
    DirectUpload,
    Completed,
    Failed { error: String },
    Cancelled,
}

impl UploadState {
    /// A run is actively driving the session.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            UploadState::Hashing
                | UploadState::Chunked
                | UploadState::Negotiating
                | UploadState::Uploading
                | UploadState::Merging
                | UploadState::DirectUpload
        )
    }

    pub fn is_resumable(&self) -> bool {
        matches!(self, UploadState::Paused | UploadState::Failed { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Cancelled)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Created => write!(f, "created"),
            UploadState::Hashing => write!(f, "hashing"),
            UploadState::Chunked => write!(f, "chunked"),
            UploadState::Negotiating => write!(f, "negotiating"),
            UploadState::Uploading => write!(f, "uploading"),
            UploadState::Paused => write!(f, "paused"),
            UploadState::Merging => write!(f, "merging"),
            UploadState::DirectUpload => write!(f, "direct upload"),
            UploadState::Completed => write!(f, "completed"),
            UploadState::Failed { error } => write!(f, "failed ({error})"),
            UploadState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    StartDirect,
    Hashed,
    Negotiate,
    Upload,
    Pause,
    Resume,
    Merge,
    Complete,
    Fail(String),
    Cancel,
}

/// Legal lifecycle transitions of one upload session.
#[derive(Debug)]
pub struct UploadLifecycle {
    state: RwLock<UploadState>,
}

impl Default for UploadLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadLifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(UploadState::Created),
        }
    }

    pub fn current_state(&self) -> UploadState {
        self.state.read().clone()
    }

    pub fn transition(&self, event: LifecycleEvent) -> UploadResult<UploadState> {
        let mut state = self.state.write();

        let new_state = match (&*state, &event) {
            // Fresh run, or a full restart of a stopped one
            (
                UploadState::Created | UploadState::Paused | UploadState::Failed { .. },
                LifecycleEvent::Start,
            ) => UploadState::Hashing,

            (
                UploadState::Created | UploadState::Paused | UploadState::Failed { .. },
                LifecycleEvent::StartDirect,
            ) => UploadState::DirectUpload,

            (UploadState::Hashing, LifecycleEvent::Hashed) => UploadState::Chunked,
            (UploadState::Chunked, LifecycleEvent::Negotiate) => UploadState::Negotiating,
            (UploadState::Negotiating, LifecycleEvent::Upload) => UploadState::Uploading,

            (UploadState::Uploading, LifecycleEvent::Pause) => UploadState::Paused,
            (UploadState::Paused | UploadState::Failed { .. }, LifecycleEvent::Resume) => {
                UploadState::Uploading
            }

            // Failed covers a merge retried on its own
            (UploadState::Uploading | UploadState::Failed { .. }, LifecycleEvent::Merge) => {
                UploadState::Merging
            }

            (UploadState::Merging | UploadState::DirectUpload, LifecycleEvent::Complete) => {
                UploadState::Completed
            }

            (current, LifecycleEvent::Fail(error)) if !current.is_terminal() => {
                UploadState::Failed {
                    error: error.clone(),
                }
            }

            (current, LifecycleEvent::Cancel) if !current.is_terminal() => UploadState::Cancelled,

            _ => {
                return Err(UploadError::InvalidState(format!(
                    "Cannot handle {:?} in state {}",
                    event, *state
                )));
            }
        };

        tracing::trace!("Upload state {} -> {}", *state, new_state);
        *state = new_state.clone();
        Ok(new_state)
    }
}
