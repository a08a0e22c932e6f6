//! Job handles and the arena slot backing them.
//!
//! A job is identified by an `(index, epoch)` pair rather than a raw
//! pointer into the region arena, so it can be validated against the
//! arena's current epoch on every use: a stale handle from a recycled
//! epoch is rejected instead of silently aliasing whatever job now lives
//! at that index.

use std::cell::UnsafeCell;
use std::sync::atomic::{ AtomicUsize, Ordering };

/// No continuation is scheduled.
pub(crate) const NO_CONTINUATION: usize = usize::MAX;

pub(crate) type JobFn = Box<dyn FnOnce() + Send + 'static>;

/// Backing storage for one job inside the scheduler's `RegionArena`.
///
/// `func` is only ever written once (at spawn) and taken once (by the
/// worker that executes it); `unfinished`/`continuation` are likewise
/// touched by exactly one thread at a time.
pub(crate) struct JobSlot {
    func: UnsafeCell<Option<JobFn>>,
    pub(crate) unfinished: AtomicUsize,
    pub(crate) continuation: AtomicUsize,
}

impl JobSlot {
    pub(crate) fn install(&self, f: JobFn) {
        unsafe {
            *self.func.get() = Some(f);
        }
        self.unfinished.store(1, Ordering::Release);
        self.continuation.store(NO_CONTINUATION, Ordering::Release);
    }

    pub(crate) fn take_func(&self) -> Option<JobFn> {
        unsafe { (*self.func.get()).take() }
    }
}

impl Default for JobSlot {
    fn default() -> Self {
        Self {
            func: UnsafeCell::new(None),
            unfinished: AtomicUsize::new(0),
            continuation: AtomicUsize::new(NO_CONTINUATION),
        }
    }
}

unsafe impl Send for JobSlot {}
unsafe impl Sync for JobSlot {}

/// A handle to a spawned job: an index into the scheduler's arena plus the
/// epoch it was allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub(crate) index: usize,
    pub(crate) epoch: usize,
}
