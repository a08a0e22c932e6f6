//! Single-producer / single-consumer bounded queue.
//!
//! The producer side never truly blocks: capacity exhaustion is detected by
//! comparing the producer head against the consumer tail before claiming a
//! slot, so `send`/`try_send` return `Full` immediately instead of spinning.

use std::sync::Arc;

use crate::error::{ RingflowError, Result };
use crate::queue::core::RingCore;

/// A single-producer / single-consumer bounded queue.
pub struct SpscQueue<T> {
    core: Arc<RingCore<T>>,
}

impl<T> SpscQueue<T> {
    /// Create a queue in state OPEN with `capacity` slots. `capacity` must
    /// be a power of two.
    pub fn create(capacity: usize) -> Result<Self> {
        Ok(Self { core: Arc::new(RingCore::new(capacity)?) })
    }

    /// Publish `state = CLOSED` with release ordering.
    pub fn close(&self) {
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Obtain the (unique) sender handle. Fails if one is already attached.
    pub fn get_sender(&self) -> Result<Sender<T>> {
        self.core.attach_producer(true)?;
        Ok(Sender { core: self.core.clone() })
    }

    /// Obtain the (unique) receiver handle. Fails if one is already
    /// attached.
    pub fn get_receiver(&self) -> Result<Receiver<T>> {
        self.core.attach_consumer(true)?;
        Ok(Receiver { core: self.core.clone() })
    }

    /// Close, then busy-wait until the attached sender and receiver have
    /// detached, then release storage.
    pub fn destroy(self) {
        self.core.close();
        self.core.wait_drained();
    }
}

/// The producer side of an [`SpscQueue`].
pub struct Sender<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Sender<T> {
    /// Send an element, returning `Full` immediately if the queue has no
    /// free slot rather than blocking.
    #[inline]
    pub fn try_send(&self, value: T) -> Result<()> {
        self.core.send_single_producer(value)
    }

    /// Alias for [`Sender::try_send`]. The SPSC full-check makes `send`
    /// effectively non-blocking already; this exists to match the external
    /// interface's generic `send` entry point.
    #[inline]
    pub fn send(&self, value: T) -> Result<()> {
        self.try_send(value)
    }

    pub fn close(&self) {
        self.core.close();
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.core.detach_producer();
    }
}

unsafe impl<T: Send> Send for Sender<T> {}

/// The consumer side of an [`SpscQueue`].
pub struct Receiver<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Receiver<T> {
    /// Non-blocking receive: `Empty` if the consumer has caught up with the
    /// producer.
    #[inline]
    pub fn recv(&self) -> Result<T> {
        self.core.try_recv_single_consumer()
    }

    pub fn close(&self) {
        self.core.close();
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.core.detach_consumer();
    }
}

unsafe impl<T: Send> Send for Receiver<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_1_to_8() {
        let q = SpscQueue::<u64>::create(4).unwrap();
        let tx = q.get_sender().unwrap();
        let rx = q.get_receiver().unwrap();

        for i in 1..=4u64 {
            tx.try_send(i).unwrap();
            // drain two, send two more to exercise wraparound with a cap of 4
        }
        for i in 1..=4u64 {
            assert_eq!(rx.recv().unwrap(), i);
        }

        for i in 5..=8u64 {
            tx.try_send(i).unwrap();
        }
        for i in 5..=8u64 {
            assert_eq!(rx.recv().unwrap(), i);
        }

        assert!(matches!(rx.recv(), Err(RingflowError::Empty)));
    }

    #[test]
    fn test_full_returns_immediately() {
        let q = SpscQueue::<u64>::create(2).unwrap();
        let tx = q.get_sender().unwrap();
        tx.try_send(1).unwrap();
        tx.try_send(2).unwrap();
        assert!(matches!(tx.try_send(3), Err(RingflowError::Full)));
    }

    #[test]
    fn test_single_sender_enforced() {
        let q = SpscQueue::<u64>::create(4).unwrap();
        let _tx = q.get_sender().unwrap();
        assert!(q.get_sender().is_err());
    }

    #[test]
    fn test_close_rejects_send() {
        let q = SpscQueue::<u64>::create(4).unwrap();
        let tx = q.get_sender().unwrap();
        q.close();
        assert!(matches!(tx.try_send(1), Err(RingflowError::Closed)));
    }

    #[test]
    fn test_threaded_spsc() {
        let q = Arc::new(SpscQueue::<u64>::create(1024).unwrap());
        let tx = q.get_sender().unwrap();
        let rx = q.get_receiver().unwrap();

        let producer = std::thread::spawn(move || {
            for i in 0..100_000u64 {
                while tx.try_send(i).is_err() {
                    std::thread::yield_now();
                }
            }
        });

        let mut received = Vec::with_capacity(100_000);
        while received.len() < 100_000 {
            match rx.recv() {
                Ok(v) => received.push(v),
                Err(_) => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert_eq!(received.len(), 100_000);
        assert!(received.windows(2).all(|w| w[0] < w[1]));
    }
}
