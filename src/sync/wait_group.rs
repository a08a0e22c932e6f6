//! A minimal busy-wait wait-group: a single atomic counter, no OS-level
//! blocking.

use std::sync::atomic::{ AtomicUsize, Ordering };

/// Lets one or more threads wait until a set of operations has completed.
///
/// Entirely spin-based: [`WaitGroup::wait`] busy-loops on
/// [`std::hint::spin_loop`] until the counter reaches zero. There is no
/// fairness guarantee and no bound on how long a caller may spin.
pub struct WaitGroup {
    count: AtomicUsize,
}

impl WaitGroup {
    /// Create a wait group with an initial counter value.
    pub fn new(initial: usize) -> Self {
        Self { count: AtomicUsize::new(initial) }
    }

    /// Add `n` to the counter.
    pub fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::Release);
    }

    /// Decrement the counter by one. Call once per completed work unit.
    pub fn done(&self) {
        self.count.fetch_sub(1, Ordering::Release);
    }

    /// Current counter value.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Busy-wait until the counter reaches zero.
    pub fn wait(&self) {
        while self.count.load(Ordering::Acquire) != 0 {
            crate::cpu::pause();
        }
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new(0)
    }
}
