//! Listener registrations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Open/closed flag shared between a [`Subscription`] and its engine callback.
///
/// The callback checks the gate before every delivery, so once `close`
/// returns no new batch starts, even if the engine still holds the
/// callback for a commit that is already running.
#[derive(Clone)]
pub(crate) struct Gate(Arc<AtomicBool>);

impl Gate {
    pub(crate) fn open() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn close(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Handle for one registered change listener.
///
/// Delivery stops when the subscription is closed or dropped.
pub struct Subscription {
    gate: Gate,
    inner: Option<yrs::Subscription>,
}

impl Subscription {
    pub(crate) fn new(gate: Gate, inner: yrs::Subscription) -> Self {
        Self {
            gate,
            inner: Some(inner),
        }
    }

    /// Stop delivery. Returns `true` only for the call that actually closed it.
    pub fn close(&mut self) -> bool {
        let closed = self.gate.close();
        // unregisters the engine callback
        self.inner.take();
        closed
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
