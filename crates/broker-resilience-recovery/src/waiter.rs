//! A sleep primitive that can be cut short.

use std::time::Duration;
use tokio::sync::Notify;

/// A sleep that [`interrupt_waiters`](InterruptableWaiter::interrupt_waiters)
/// can end early.
///
/// Interruption is a signal, not an error: an awakened sleeper proceeds
/// exactly as if the full duration had elapsed. Any number of tasks may
/// sleep concurrently.
pub struct InterruptableWaiter {
    notify: Notify,
}

impl InterruptableWaiter {
    /// Creates a waiter with no sleepers.
    pub fn new() -> Self {
        Self {
            notify: Notify::new(),
        }
    }

    /// Sleeps for up to `duration`.
    pub async fn wait_for(&self, duration: Duration) {
        let interrupted = self.notify.notified();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();
        tokio::select! {
            _ = &mut interrupted => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    /// Wakes every current sleeper.
    pub fn interrupt_waiters(&self) {
        self.notify.notify_waiters();
    }
}

impl Default for InterruptableWaiter {
    fn default() -> Self {
        Self::new()
    }
}
