//! Minimum spacing between outbound calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Shared throttle enforcing a floor between consecutive dispatches.
///
/// Clones share the same last-dispatch instant. The lock is held across the
/// sleep and the update, so concurrent callers are released one at a time and
/// never closer together than `min_interval`.
#[derive(Debug, Clone)]
pub struct RequestGate {
    min_interval: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl RequestGate {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `min_interval` has passed since the previous caller was
    /// released, then record now as the new dispatch time.
    pub async fn wait_if_needed(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval.saturating_sub(elapsed);
                tracing::debug!(wait_ms = wait.as_millis(), "request gate: waiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
