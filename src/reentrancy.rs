//! Debug-only reentrancy guard.
//!
//! Detects a thread calling back into a table while it already holds the
//! table's exclusive lock from a caller-supplied closure. The lock is not
//! reentrant, so such a call would otherwise deadlock silently. In debug
//! builds the nested call panics instead. In release builds this compiles
//! to a zero-cost no-op.
//!
//! Unlike a depth counter, the tracker records which thread is inside, so
//! other threads keep using the table normally while one closure runs.

#[cfg(debug_assertions)]
use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(debug_assertions)]
thread_local! {
    static MARKER: u8 = const { 0 };
}

// A non-zero token unique to each live thread.
#[cfg(debug_assertions)]
fn current_thread() -> usize {
    MARKER.with(|m| m as *const u8 as usize)
}

/// Per-table reentrancy tracker. Public entry points call `check()` before
/// locking; closures run under the lock are bracketed with `enter()`.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    owner: AtomicUsize,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            owner: AtomicUsize::new(0),
        }
    }

    /// Panics in debug builds if the calling thread is inside `enter()`.
    #[inline]
    pub(crate) fn check(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.owner.load(Ordering::Relaxed) != current_thread(),
            "reentrancy detected: nested entry into data structure"
        );
    }

    /// Marks the calling thread as running code under the exclusive lock.
    /// Only call this while holding that lock.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let previous = self.owner.swap(current_thread(), Ordering::Relaxed);
            debug_assert_eq!(previous, 0);
        }
        ReentrancyGuard { owner: self }
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    owner: &'a DebugReentrancy,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.owner.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn enter_and_exit_is_ok() {
        let r = DebugReentrancy::new();
        r.check();
        {
            let _g = r.enter();
        }
        r.check();
    }

    #[test]
    fn other_threads_pass_while_entered() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        std::thread::scope(|s| {
            s.spawn(|| r.check());
        });
    }

    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = r.enter();
            r.check();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
        // The guard was dropped during unwinding.
        r.check();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn reentrancy_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        r.check();
    }
}
