use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable abort flag checked between competitors.
///
/// A competitor already in progress is always finished before the abort
/// takes effect.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    aborted: Arc<AtomicBool>,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}
