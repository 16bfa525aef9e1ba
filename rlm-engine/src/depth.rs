//! The shared recursion depth counter (spec §4.5 "Recursion"; §5 "the
//! depth counter is shared between parent and sub-agents... incremented/
//! decremented atomically").
//!
//! Grounded in `agent-runtime::sub_agent::SubAgentManager::spawn`'s
//! `current_depth >= config.max_depth` cap check, generalized from a
//! plain counter argument to a shared, guard-based one since `llm_query`/
//! `rlm_query` enter and leave depth from inside sandboxed tool calls
//! rather than from one caller's stack frame alone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default recursion depth cap (spec §4.5: "default 5").
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 5;

/// A depth counter shared by one environment and all of its in-flight
/// sub-agents.
#[derive(Clone)]
pub struct DepthCounter {
    depth: Arc<AtomicUsize>,
    cap: usize,
}

impl DepthCounter {
    /// Create a fresh counter at depth 0 with the given cap.
    pub fn new(cap: usize) -> Self {
        Self {
            depth: Arc::new(AtomicUsize::new(0)),
            cap,
        }
    }

    /// Current depth.
    pub fn current(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// The configured cap.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Attempt to enter one level of recursion. Returns `None` (and
    /// leaves the counter untouched) if doing so would reach the cap;
    /// `llm_query`/`rlm_query` return a fixed error value in that case
    /// rather than calling (spec §4.5, §5: "never a thrown fault").
    /// Returns a guard that decrements the counter on drop otherwise.
    pub fn try_enter(&self) -> Option<DepthGuard> {
        let mut current = self.depth.load(Ordering::SeqCst);
        loop {
            if current >= self.cap {
                return None;
            }
            match self.depth.compare_exchange_weak(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Some(DepthGuard {
                        depth: Arc::clone(&self.depth),
                    })
                }
                Err(observed) => current = observed,
            }
        }
    }
}

/// Decrements the shared depth counter when dropped, regardless of how
/// the guarded call exits (error, panic unwind, or success).
pub struct DepthGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entering_increments_and_dropping_decrements() {
        let counter = DepthCounter::new(3);
        assert_eq!(counter.current(), 0);
        let guard = counter.try_enter().unwrap();
        assert_eq!(counter.current(), 1);
        drop(guard);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn cap_refuses_entry_at_the_limit() {
        let counter = DepthCounter::new(1);
        let guard = counter.try_enter().unwrap();
        assert!(counter.try_enter().is_none());
        drop(guard);
        assert!(counter.try_enter().is_some());
    }

    #[test]
    fn shared_clones_see_the_same_depth() {
        let counter = DepthCounter::new(2);
        let clone = counter.clone();
        let _guard = counter.try_enter().unwrap();
        assert_eq!(clone.current(), 1);
    }
}
