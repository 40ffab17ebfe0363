use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative pause and cancel flags shared between a session and the
/// handles given out to callers.
///
/// The scheduler only looks at these between batches, so requests already
/// in flight always run to completion.
#[derive(Debug, Default)]
pub struct UploadControl {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl UploadControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn clear_pause(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
