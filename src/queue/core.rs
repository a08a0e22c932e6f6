//! Shared slot/cursor protocol underlying all four queue variants.
//!
//! This is the Vyukov bounded-queue protocol: each slot carries its own
//! sequence number; a producer claims position `p` by observing
//! `seq == p`, writes, then publishes `seq = p + 1`; a consumer claims `c`
//! by observing `seq == c + 1`, reads, then re-arms the slot one full
//! revolution ahead with `seq = c + capacity`.
//!
//! The four public queue types (`spsc`, `mpsc`, `spmc`, `mpmc`) all build on
//! `RingCore<T>`; they differ only in how they claim a producer or consumer
//! position (single relaxed read vs. CAS fetch-add).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{ AtomicU8, AtomicUsize, Ordering };

use crate::constants::CACHE_LINE_SIZE;
use crate::cpu::pause;
use crate::error::{ RingflowError, Result };

const OPEN: u8 = 0;
const CLOSED: u8 = 1;

/// One ring slot: a sequence number plus trivially-copyable storage for one
/// element. At any quiescent point `seq ∈ { pos, pos+1, pos+capacity }`.
pub(crate) struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new(seq: usize) -> Self {
        Self {
            sequence: AtomicUsize::new(seq),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline(always)]
    unsafe fn write(&self, value: T) {
        (*self.value.get()).as_mut_ptr().write(value);
    }

    #[inline(always)]
    unsafe fn read(&self) -> T {
        (*self.value.get()).as_ptr().read()
    }
}

unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

/// Cache-line padded atomic cursor. Producer head and consumer tail live on
/// distinct cache lines to avoid false sharing.
#[repr(align(64))]
pub(crate) struct PaddedCursor {
    value: AtomicUsize,
    _pad: [u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicUsize>()],
}

impl PaddedCursor {
    fn new(initial: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial),
            _pad: [0; CACHE_LINE_SIZE - std::mem::size_of::<AtomicUsize>()],
        }
    }

    #[inline(always)]
    fn load(&self, order: Ordering) -> usize {
        self.value.load(order)
    }

    #[inline(always)]
    fn store(&self, v: usize, order: Ordering) {
        self.value.store(v, order);
    }

    #[inline(always)]
    fn fetch_add(&self, v: usize, order: Ordering) -> usize {
        self.value.fetch_add(v, order)
    }

    #[inline(always)]
    fn compare_exchange_weak(
        &self,
        current: usize,
        new: usize
    ) -> std::result::Result<usize, usize> {
        self.value.compare_exchange_weak(
            current,
            new,
            Ordering::AcqRel,
            Ordering::Relaxed
        )
    }
}

/// Shared ring storage and bookkeeping for all four queue cardinalities.
pub(crate) struct RingCore<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    capacity: usize,
    producer_cursor: PaddedCursor,
    consumer_cursor: PaddedCursor,
    producers_alive: AtomicUsize,
    consumers_alive: AtomicUsize,
    state: AtomicU8,
}

unsafe impl<T: Send> Send for RingCore<T> {}
unsafe impl<T: Send> Sync for RingCore<T> {}

impl<T> RingCore<T> {
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingflowError::config("capacity must be a power of two and >= 1"));
        }

        let slots = (0..capacity)
            .map(Slot::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            mask: capacity - 1,
            capacity,
            producer_cursor: PaddedCursor::new(0),
            consumer_cursor: PaddedCursor::new(0),
            producers_alive: AtomicUsize::new(0),
            consumers_alive: AtomicUsize::new(0),
            state: AtomicU8::new(OPEN),
        })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn slot(&self, pos: usize) -> &Slot<T> {
        &self.slots[pos & self.mask]
    }

    #[inline(always)]
    pub(crate) fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    pub(crate) fn close(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }

    // ---- handle lifecycle -------------------------------------------------

    /// Attach a producer handle, optionally capping live producers at one
    /// (SPSC / SPMC). Returns an error if the cap would be exceeded.
    pub(crate) fn attach_producer(&self, single: bool) -> Result<()> {
        if single {
            self.producers_alive
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Relaxed)
                .map_err(|_| RingflowError::config("producer already attached to a single-producer queue"))?;
        } else {
            self.producers_alive.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    pub(crate) fn detach_producer(&self) {
        self.producers_alive.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn attach_consumer(&self, single: bool) -> Result<()> {
        if single {
            self.consumers_alive
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Relaxed)
                .map_err(|_| RingflowError::config("consumer already attached to a single-consumer queue"))?;
        } else {
            self.consumers_alive.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    pub(crate) fn detach_consumer(&self) {
        self.consumers_alive.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn producers_alive(&self) -> usize {
        self.producers_alive.load(Ordering::Acquire)
    }

    pub(crate) fn consumers_alive(&self) -> usize {
        self.consumers_alive.load(Ordering::Acquire)
    }

    /// Busy-wait until no producer or consumer handle remains attached.
    pub(crate) fn wait_drained(&self) {
        while self.producers_alive() != 0 || self.consumers_alive() != 0 {
            pause();
        }
    }

    // ---- producer side ------------------------------------------------

    /// Claim the next position without coordination (SPSC / SPMC producer —
    /// there is exactly one, so a plain relaxed read-then-store suffices).
    #[inline(always)]
    fn claim_single_producer(&self) -> usize {
        let pos = self.producer_cursor.load(Ordering::Relaxed);
        self.producer_cursor.store(pos + 1, Ordering::Relaxed);
        pos
    }

    /// Claim the next position among multiple producers via a CAS loop
    /// (MPSC / MPMC). Rechecks `Closed` before every attempt, so a producer
    /// spinning against contention can't claim a position the consumer side
    /// has already started tearing down.
    fn claim_multi_producer(&self) -> Result<usize> {
        loop {
            if self.is_closed() {
                return Err(RingflowError::Closed);
            }
            let pos = self.producer_cursor.load(Ordering::Relaxed);
            match self.producer_cursor.compare_exchange_weak(pos, pos + 1) {
                Ok(_) => {
                    return Ok(pos);
                }
                Err(_) => pause(),
            }
        }
    }

    /// SPSC's non-blocking full check: true when the producer has lapped
    /// the consumer by a full revolution.
    #[inline(always)]
    fn is_full(&self, claimed: usize) -> bool {
        let tail = self.consumer_cursor.load(Ordering::Relaxed);
        claimed.wrapping_sub(tail) >= self.capacity
    }

    /// Busy-wait for `slot.sequence == pos`, write, and publish `pos + 1`
    /// with release ordering. Rechecks `Closed` on every spin.
    fn write_and_publish(&self, pos: usize, value: T) -> Result<()> {
        let slot = self.slot(pos);
        loop {
            let seq = slot.sequence.load(Ordering::Acquire);
            if seq == pos {
                break;
            }
            if self.is_closed() {
                return Err(RingflowError::Closed);
            }
            pause();
        }
        unsafe {
            slot.write(value);
        }
        slot.sequence.store(pos + 1, Ordering::Release);
        Ok(())
    }

    /// SPSC send: non-blocking full check, then claim + write + publish.
    /// In practice the busy-wait inside `write_and_publish` never spins for
    /// a true single-producer/single-consumer pairing, since `is_full`
    /// already established the slot was vacated.
    pub(crate) fn send_single_producer(&self, value: T) -> Result<()> {
        if self.is_closed() {
            return Err(RingflowError::Closed);
        }
        let pos = self.producer_cursor.load(Ordering::Relaxed);
        if self.is_full(pos) {
            return Err(RingflowError::Full);
        }
        let claimed = self.claim_single_producer();
        self.write_and_publish(claimed, value)
    }

    /// SPMC send: single producer, no CAS, but no non-blocking full
    /// shortcut either — the producer busy-waits for the slot to free up.
    pub(crate) fn send_single_producer_blocking(&self, value: T) -> Result<()> {
        if self.is_closed() {
            return Err(RingflowError::Closed);
        }
        let claimed = self.claim_single_producer();
        self.write_and_publish(claimed, value)
    }

    /// MPSC / MPMC send: CAS-claim among producers, then busy-wait write.
    pub(crate) fn send_multi_producer(&self, value: T) -> Result<()> {
        let claimed = self.claim_multi_producer()?;
        self.write_and_publish(claimed, value)
    }

    // ---- consumer side ------------------------------------------------

    /// Non-blocking read for SPSC / MPSC: `Empty` if the consumer has
    /// caught up to the producer, otherwise validate-and-copy.
    pub(crate) fn try_recv_single_consumer(&self) -> Result<T> {
        let tail = self.consumer_cursor.load(Ordering::Relaxed);
        let head = self.producer_cursor.load(Ordering::Acquire);
        if tail == head {
            return Err(RingflowError::Empty);
        }
        let slot = self.slot(tail);
        let seq = slot.sequence.load(Ordering::Acquire);
        if seq != tail + 1 {
            return Err(RingflowError::Empty);
        }
        let value = unsafe { slot.read() };
        self.consumer_cursor.store(tail + 1, Ordering::Relaxed);
        slot.sequence.store(tail + self.capacity, Ordering::Release);
        Ok(value)
    }

    /// Blocking read for SPMC / MPMC consumers: claim a consumer position
    /// via fetch-add, busy-wait for the slot to be published, copy, and
    /// re-arm one revolution ahead.
    pub(crate) fn recv_multi_consumer(&self) -> Result<T> {
        if self.is_closed() {
            // Closing does not discard already-published elements; only
            // bail early if there is nothing left to drain.
            let head = self.producer_cursor.load(Ordering::Acquire);
            let tail = self.consumer_cursor.load(Ordering::Relaxed);
            if tail >= head {
                return Err(RingflowError::Closed);
            }
        }
        let pos = self.consumer_cursor.fetch_add(1, Ordering::AcqRel);
        let slot = self.slot(pos);
        loop {
            let seq = slot.sequence.load(Ordering::Acquire);
            if seq == pos + 1 {
                break;
            }
            if self.is_closed() {
                let head = self.producer_cursor.load(Ordering::Acquire);
                if pos >= head {
                    return Err(RingflowError::Closed);
                }
            }
            pause();
        }
        let value = unsafe { slot.read() };
        slot.sequence.store(pos + self.capacity, Ordering::Release);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(RingCore::<u64>::new(0).is_err());
        assert!(RingCore::<u64>::new(3).is_err());
        assert!(RingCore::<u64>::new(4).is_ok());
    }

    #[test]
    fn test_single_producer_round_trip() {
        let core = RingCore::<u64>::new(4).unwrap();
        core.send_single_producer(1).unwrap();
        core.send_single_producer(2).unwrap();
        assert_eq!(core.try_recv_single_consumer().unwrap(), 1);
        assert_eq!(core.try_recv_single_consumer().unwrap(), 2);
        assert!(matches!(core.try_recv_single_consumer(), Err(RingflowError::Empty)));
    }

    #[test]
    fn test_single_producer_full() {
        let core = RingCore::<u64>::new(2).unwrap();
        core.send_single_producer(1).unwrap();
        core.send_single_producer(2).unwrap();
        assert!(matches!(core.send_single_producer(3), Err(RingflowError::Full)));
    }

    #[test]
    fn test_attach_cap_enforced() {
        let core = RingCore::<u64>::new(4).unwrap();
        core.attach_producer(true).unwrap();
        assert!(core.attach_producer(true).is_err());
        core.detach_producer();
        assert!(core.attach_producer(true).is_ok());
    }

    #[test]
    fn test_close_unblocks_blocking_consumer() {
        let core = std::sync::Arc::new(RingCore::<u64>::new(4).unwrap());
        let c2 = core.clone();
        let handle = std::thread::spawn(move || c2.recv_multi_consumer());
        std::thread::sleep(std::time::Duration::from_millis(20));
        core.close();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(RingflowError::Closed)));
    }
}
