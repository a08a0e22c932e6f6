//! Flat (bump) arena: a contiguous, indexable buffer with FIXED or DYNAMIC
//! growth.
//!
//! Growth (DYNAMIC mode) replaces the whole backing buffer, which is unsafe
//! to do underneath concurrent readers without some exclusion, so every
//! mutating and reading operation goes through a small spin-based guard.
//! Reads need it too since a DYNAMIC grow invalidates the previous buffer
//! entirely.

use std::cell::UnsafeCell;
use std::sync::atomic::{ AtomicBool, Ordering };

use crate::constants::{ DEFAULT_FLAT_ARENA_CAPACITY, FLAT_ARENA_GROWTH_FACTOR };
use crate::cpu::pause;
use crate::error::{ RingflowError, Result };

/// Controls what happens when a [`FlatArena`] runs out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Capacity never grows; overflow is a hard [`RingflowError::ArenaFull`].
    Fixed,
    /// Capacity grows by [`FLAT_ARENA_GROWTH_FACTOR`] on overflow.
    Dynamic,
}

struct Spinlock {
    locked: AtomicBool,
}

impl Spinlock {
    const fn new() -> Self {
        Self { locked: AtomicBool::new(false) }
    }

    fn lock(&self) -> SpinlockGuard<'_> {
        while
            self.locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            pause();
        }
        SpinlockGuard { lock: self }
    }
}

struct SpinlockGuard<'a> {
    lock: &'a Spinlock,
}

impl Drop for SpinlockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// A contiguous, growable arena with FIXED or DYNAMIC capacity behavior.
pub struct FlatArena<T> {
    lock: Spinlock,
    data: UnsafeCell<Vec<T>>,
    policy: GrowthPolicy,
}

unsafe impl<T: Send> Send for FlatArena<T> {}
unsafe impl<T: Send> Sync for FlatArena<T> {}

impl<T> FlatArena<T> {
    /// Create an arena. `starting_capacity == 0` defaults to
    /// [`DEFAULT_FLAT_ARENA_CAPACITY`] (matches `arena_create`'s default of
    /// 8 elements).
    pub fn create(starting_capacity: usize, policy: GrowthPolicy) -> Self {
        let capacity = if starting_capacity == 0 {
            DEFAULT_FLAT_ARENA_CAPACITY
        } else {
            starting_capacity
        };
        Self {
            lock: Spinlock::new(),
            data: UnsafeCell::new(Vec::with_capacity(capacity)),
            policy,
        }
    }

    /// Append `val`. FIXED arenas return `ArenaFull` instead of growing.
    pub fn add(&self, val: T) -> Result<()> {
        let _guard = self.lock.lock();
        let data = unsafe { &mut *self.data.get() };
        if data.len() == data.capacity() {
            self.grow_locked(data)?;
        }
        data.push(val);
        Ok(())
    }

    fn grow_locked(&self, data: &mut Vec<T>) -> Result<()> {
        match self.policy {
            GrowthPolicy::Fixed => Err(RingflowError::ArenaFull { capacity: data.capacity() }),
            GrowthPolicy::Dynamic => {
                let new_cap = ((data.capacity() as f64) * FLAT_ARENA_GROWTH_FACTOR) as usize;
                let new_cap = new_cap.max(data.capacity() + 1);
                data.reserve_exact(new_cap - data.capacity());
                Ok(())
            }
        }
    }

    /// Reserve a slot and fill it with `T::default()`, returning its index.
    pub fn alloc(&self) -> Result<usize> where T: Default {
        let _guard = self.lock.lock();
        let data = unsafe { &mut *self.data.get() };
        if data.len() == data.capacity() {
            self.grow_locked(data)?;
        }
        data.push(T::default());
        Ok(data.len() - 1)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        let _guard = self.lock.lock();
        unsafe { &*self.data.get() }.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current backing capacity.
    pub fn capacity(&self) -> usize {
        let _guard = self.lock.lock();
        unsafe { &*self.data.get() }.capacity()
    }

    pub fn get(&self, i: usize) -> Option<T> where T: Clone {
        let _guard = self.lock.lock();
        unsafe { &*self.data.get() }.get(i).cloned()
    }

    pub fn get_last(&self) -> Option<T> where T: Clone {
        let _guard = self.lock.lock();
        let data = unsafe { &*self.data.get() };
        data.last().cloned()
    }

    /// Remove and return the last element, if any.
    pub fn pop(&self) -> Option<T> {
        let _guard = self.lock.lock();
        unsafe { &mut *self.data.get() }.pop()
    }

    /// Reset length to zero. Backing memory is kept and reused.
    pub fn reset(&self) {
        let _guard = self.lock.lock();
        unsafe { &mut *self.data.get() }.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_overflow_returns_error() {
        let arena = FlatArena::<u64>::create(2, GrowthPolicy::Fixed);
        arena.add(1).unwrap();
        arena.add(2).unwrap();
        assert!(matches!(arena.add(3), Err(RingflowError::ArenaFull { .. })));
    }

    #[test]
    fn test_dynamic_grows_past_starting_capacity() {
        let arena = FlatArena::<u64>::create(2, GrowthPolicy::Dynamic);
        for i in 0..10u64 {
            arena.add(i).unwrap();
        }
        assert_eq!(arena.len(), 10);
        assert!(arena.capacity() >= 10);
    }

    #[test]
    fn test_get_and_get_last() {
        let arena = FlatArena::<u64>::create(4, GrowthPolicy::Fixed);
        arena.add(10).unwrap();
        arena.add(20).unwrap();
        assert_eq!(arena.get(0), Some(10));
        assert_eq!(arena.get(1), Some(20));
        assert_eq!(arena.get_last(), Some(20));
        assert_eq!(arena.get(5), None);
    }

    #[test]
    fn test_pop_and_reset() {
        let arena = FlatArena::<u64>::create(4, GrowthPolicy::Fixed);
        arena.add(1).unwrap();
        arena.add(2).unwrap();
        assert_eq!(arena.pop(), Some(2));
        assert_eq!(arena.len(), 1);
        arena.reset();
        assert_eq!(arena.len(), 0);
        assert!(arena.pop().is_none());
    }

    #[test]
    fn test_default_starting_capacity() {
        let arena = FlatArena::<u64>::create(0, GrowthPolicy::Dynamic);
        assert_eq!(arena.capacity(), DEFAULT_FLAT_ARENA_CAPACITY);
    }
}
