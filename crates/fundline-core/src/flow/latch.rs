//! Per-action re-entrancy latch.
//!
//! Each async action the flow exposes is guarded by one of these so a
//! double-submission (button mashed before the first call settles) never
//! puts two gateway calls for the same logical action in flight. This is a
//! busy/idle latch, not a lock: a second caller is refused, it does not
//! wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Guard preventing duplicate concurrent invocation of one action.
#[derive(Clone, Default)]
pub struct ActionLatch {
    in_flight: Arc<AtomicBool>,
}

impl ActionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to move the latch from idle to in-flight. Returns `None`
    /// when the action is already running. The returned guard settles the
    /// latch back to idle when dropped, on every exit path.
    pub fn try_begin(&self) -> Option<LatchGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LatchGuard {
                in_flight: self.in_flight.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// RAII handle for an in-flight action.
pub struct LatchGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_while_in_flight() {
        let latch = ActionLatch::new();
        let guard = latch.try_begin();
        assert!(guard.is_some());
        assert!(latch.is_busy());
        assert!(latch.try_begin().is_none());
    }

    #[test]
    fn dropping_the_guard_releases_the_latch() {
        let latch = ActionLatch::new();
        drop(latch.try_begin());
        assert!(!latch.is_busy());
        assert!(latch.try_begin().is_some());
    }
}
