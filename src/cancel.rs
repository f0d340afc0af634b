//! Per-attempt cancellation.
//!
//! A [`CancelHandle`] is owned by exactly one attempt. The transport gets a
//! [`CancelSignal`] cloned from it and may poll or await it. Signaling is a
//! one-way, idempotent transition.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// The owning side. Dropping it does not cancel; call [`CancelHandle::signal`].
#[derive(Debug, Default)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Returns `true` only for the call that flipped it.
    pub fn signal(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_signaled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A read-only view for the transport.
    pub fn token(&self) -> CancelSignal {
        CancelSignal {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The observing side handed to the transport.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the owning handle is signaled.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent signal is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
