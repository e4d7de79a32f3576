//! Cooperative cancellation signal
//!
//! Every execution context owns one [`AbortSignal`]. The executor flips it
//! when the context is superseded or the executor is disposed; submitted
//! work may observe it to stop early, but is never forcibly terminated.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct SignalInner {
    aborted: AtomicBool,
    notify: Notify,
}

/// Cancellation signal handed to submitted work
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<SignalInner>,
}

impl AbortSignal {
    /// Create a signal that is not aborted
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                aborted: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Whether the owning context was superseded or disposed
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    /// Wait until the signal is aborted
    ///
    /// Returns immediately if the signal is already aborted. Useful in a
    /// `tokio::select!` next to the actual work.
    pub async fn aborted(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_aborted() {
            return;
        }
        notified.await;
    }

    /// Mark the signal aborted; returns false if it already was
    pub(crate) fn abort(&self) -> bool {
        if self.inner.aborted.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.notify.notify_waiters();
        true
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
