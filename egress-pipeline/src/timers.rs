//! Single-shot timers with race-safe cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A timer that either fires or is cancelled, exactly once.
///
/// Expiry and cancellation race on one atomic swap, so a cancel arriving
/// in the same instant as expiry still produces a single outcome.
#[derive(Debug)]
pub(crate) struct OneShot {
    settled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl OneShot {
    /// Arm a timer that runs `on_expire` after `delay` unless cancelled.
    pub fn after<F>(delay: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let settled = Arc::new(AtomicBool::new(false));
        let flag = settled.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.swap(true, Ordering::AcqRel) {
                on_expire();
            }
        });

        Self { settled, handle }
    }

    /// Cancel the timer. A no-op when it already fired or was cancelled.
    pub fn cancel(&self) {
        if !self.settled.swap(true, Ordering::AcqRel) {
            self.handle.abort();
        }
    }
}
