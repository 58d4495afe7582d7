//! Lock-free statistics of the query coordinator

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use super::types::CoordinatorState;

/// Counters shared between the coordination loop and every handle
#[derive(Debug)]
pub struct CoordinatorStats {
    pub served: AtomicUsize,
    pub failed: AtomicUsize,
    pub rejected: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub refresh_failures: AtomicUsize,
    state: AtomicU8,
}

impl CoordinatorStats {
    #[inline]
    pub fn new() -> Self {
        Self {
            served: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            refresh_failures: AtomicUsize::new(0),
            state: AtomicU8::new(CoordinatorState::Idle as u8),
        }
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_state(&self, state: CoordinatorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Get snapshot of current statistics
    #[must_use]
    pub fn snapshot(&self) -> CoordinatorStatsSnapshot {
        CoordinatorStatsSnapshot {
            served: self.served.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            state: self.state(),
        }
    }
}

impl Default for CoordinatorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of coordinator statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatsSnapshot {
    /// Queries answered with a result
    pub served: usize,
    /// Queries answered with an error
    pub failed: usize,
    /// Submissions turned away because the queue was full
    pub rejected: usize,
    /// Refreshes that scanned the store, whether timer- or query-driven
    pub refreshes: usize,
    pub refresh_failures: usize,
    pub state: CoordinatorState,
}
