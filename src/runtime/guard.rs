//! Single-turn guard
//!
//! Asynchronous triggers (speech events) may fire while a turn is still
//! running. The guard admits one turn at a time; an overlapping trigger is
//! dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TurnGuard {
    active: Arc<AtomicBool>,
}

impl TurnGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a turn is already in progress.
    /// The guard is released when the returned permit is dropped.
    pub fn try_begin(&self) -> Option<TurnPermit> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TurnPermit {
                active: Arc::clone(&self.active),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Proof that a turn holds the guard
#[derive(Debug)]
pub struct TurnPermit {
    active: Arc<AtomicBool>,
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
