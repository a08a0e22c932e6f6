//! Segmented arena allocator with epoch-based O(1) reset.
//!
//! Elements live across fixed-capacity regions allocated lazily on first
//! touch:
//!
//! ```text
//! region 0: [0 .. rg_capacity-1]
//! region 1: [rg_capacity .. 2*rg_capacity-1]
//! ...
//! ```
//!
//! [`RegionArena::reset`] bumps a global epoch instead of freeing anything;
//! a region's contents are lazily zeroed the next time an allocation lands
//! in it and its stored epoch no longer matches. Allocating a region past
//! `max_regions` returns [`RingflowError::RegionOverflow`] rather than
//! aborting the process, matching every other capacity violation in this
//! crate.

use std::cell::UnsafeCell;
use std::sync::atomic::{ AtomicUsize, Ordering };

use crate::cpu::pause;
use crate::error::{ RingflowError, Result };

struct RegionData<T> {
    slots: Box<[UnsafeCell<T>]>,
    epoch: AtomicUsize,
}

unsafe impl<T: Send> Send for RegionData<T> {}
unsafe impl<T: Send> Sync for RegionData<T> {}

/// A segmented, epoch-reset arena of `T`.
pub struct RegionArena<T> {
    region_capacity: usize,
    max_regions: usize,
    regions_in_use: AtomicUsize,
    count: AtomicUsize,
    current_epoch: AtomicUsize,
    regions: Box<[UnsafeCell<Option<Box<RegionData<T>>>>]>,
}

unsafe impl<T: Send> Send for RegionArena<T> {}
unsafe impl<T: Send> Sync for RegionArena<T> {}

impl<T: Default> RegionArena<T> {
    /// Create an arena with `region_capacity` elements per region and a
    /// ceiling of `max_regions` regions (`0` defaults to 1024). Region 0
    /// is allocated eagerly.
    pub fn create(region_capacity: usize, max_regions: usize) -> Result<Self> {
        if region_capacity == 0 {
            return Err(RingflowError::config("region_capacity must be > 0"));
        }
        let max_regions = if max_regions == 0 { 1024 } else { max_regions };

        let regions: Vec<UnsafeCell<Option<Box<RegionData<T>>>>> = (0..max_regions)
            .map(|_| UnsafeCell::new(None))
            .collect();
        let regions = regions.into_boxed_slice();

        let first = Box::new(RegionData {
            slots: (0..region_capacity).map(|_| UnsafeCell::new(T::default())).collect(),
            epoch: AtomicUsize::new(0),
        });
        unsafe {
            *regions[0].get() = Some(first);
        }

        Ok(Self {
            region_capacity,
            max_regions,
            regions_in_use: AtomicUsize::new(1),
            count: AtomicUsize::new(0),
            current_epoch: AtomicUsize::new(0),
            regions,
        })
    }

    /// Current epoch. Job handles allocated in one epoch must not be
    /// trusted once the epoch has moved on past a [`RegionArena::reset`].
    #[inline]
    pub fn epoch(&self) -> usize {
        self.current_epoch.load(Ordering::Acquire)
    }

    /// Number of elements allocated since the last reset.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_region(&self, region: usize) -> Result<()> {
        if region >= self.max_regions {
            return Err(RingflowError::RegionOverflow {
                region,
                max_regions: self.max_regions,
            });
        }

        let used = self.regions_in_use.load(Ordering::Acquire);
        if region < used {
            let slot = unsafe { &*self.regions[region].get() };
            let data = slot.as_ref().expect("region below regions_in_use must exist");
            let epoch = self.current_epoch.load(Ordering::Acquire);
            if data.epoch.load(Ordering::Acquire) != epoch {
                // Lazily clear this region's contents for the new epoch.
                // Concurrent callers may race to do this redundantly; each
                // write is idempotent (same `T::default()`), so the race
                // is harmless.
                for cell in data.slots.iter() {
                    unsafe {
                        *cell.get() = T::default();
                    }
                }
                data.epoch.store(epoch, Ordering::Release);
            }
            return Ok(());
        }

        match
            self.regions_in_use.compare_exchange(
                used,
                region + 1,
                Ordering::AcqRel,
                Ordering::Relaxed
            )
        {
            Ok(_) => {
                let data = Box::new(RegionData {
                    slots: (0..self.region_capacity)
                        .map(|_| UnsafeCell::new(T::default()))
                        .collect(),
                    epoch: AtomicUsize::new(self.current_epoch.load(Ordering::Acquire)),
                });
                unsafe {
                    *self.regions[region].get() = Some(data);
                }
                Ok(())
            }
            Err(_) => {
                while self.regions_in_use.load(Ordering::Acquire) <= region {
                    pause();
                }
                Ok(())
            }
        }
    }

    /// Copy `val` into the next available slot, returning its global index.
    pub fn add(&self, val: T) -> Result<usize> {
        let count = self.count.fetch_add(1, Ordering::AcqRel);
        let region = count / self.region_capacity;
        let index = count % self.region_capacity;
        self.ensure_region(region)?;
        let slot = unsafe { &*self.regions[region].get() };
        let data = slot.as_ref().unwrap();
        unsafe {
            *data.slots[index].get() = val;
        }
        Ok(count)
    }

    /// Reserve a slot, leaving it `T::default()`-initialized, and return its
    /// global index for the caller to fill in place via [`RegionArena::get`].
    pub fn alloc(&self) -> Result<usize> {
        let count = self.count.fetch_add(1, Ordering::AcqRel);
        let region = count / self.region_capacity;
        self.ensure_region(region)?;
        Ok(count)
    }

    /// Borrow the element at global index `i`, or `None` if it is out of
    /// bounds for the current epoch's allocation count.
    pub fn get(&self, i: usize) -> Option<&T> {
        let count = self.count.load(Ordering::Acquire);
        if i >= count {
            return None;
        }
        let region = i / self.region_capacity;
        let index = i % self.region_capacity;
        let slot = unsafe { &*self.regions[region].get() };
        let data = slot.as_ref()?;
        Some(unsafe { &*data.slots[index].get() })
    }

    /// Borrow the most recently allocated element.
    pub fn get_last(&self) -> Option<&T> {
        let count = self.count.load(Ordering::Acquire);
        if count == 0 {
            return None;
        }
        self.get(count - 1)
    }

    /// Bump the epoch and reset the allocation count to zero. O(1);
    /// existing region buffers are reclaimed lazily as they're touched
    /// again. All indices returned before this call become invalid.
    pub fn reset(&self) {
        self.current_epoch.fetch_add(1, Ordering::AcqRel);
        self.count.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_round_trip() {
        let arena = RegionArena::<u64>::create(4, 4).unwrap();
        for i in 0..4u64 {
            arena.add(i).unwrap();
        }
        for i in 0..4u64 {
            assert_eq!(arena.get(i as usize), Some(&i));
        }
        assert_eq!(arena.get_last(), Some(&3));
    }

    #[test]
    fn test_spans_multiple_regions() {
        let arena = RegionArena::<u64>::create(4, 4).unwrap();
        for i in 0..10u64 {
            arena.add(i).unwrap();
        }
        assert_eq!(arena.len(), 10);
        assert_eq!(arena.get(9), Some(&9));
    }

    #[test]
    fn test_overflow_returns_error_not_abort() {
        let arena = RegionArena::<u64>::create(2, 2).unwrap();
        for i in 0..4u64 {
            arena.add(i).unwrap();
        }
        assert!(matches!(arena.add(5), Err(RingflowError::RegionOverflow { .. })));
    }

    #[test]
    fn test_reset_reuses_regions_with_new_epoch() {
        let arena = RegionArena::<u64>::create(4, 4).unwrap();
        arena.add(1).unwrap();
        arena.add(2).unwrap();
        assert_eq!(arena.epoch(), 0);

        arena.reset();
        assert_eq!(arena.epoch(), 1);
        assert_eq!(arena.len(), 0);
        assert!(arena.get(0).is_none());

        let idx = arena.add(99).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(arena.get(0), Some(&99));
    }

    #[test]
    fn test_alloc_then_fill_via_index() {
        #[derive(Default, PartialEq, Debug, Clone, Copy)]
        struct Counter(u64);

        let arena = RegionArena::<Counter>::create(4, 4).unwrap();
        let idx = arena.alloc().unwrap();
        assert_eq!(arena.get(idx), Some(&Counter(0)));
    }
}
