//! Multi-producer / multi-consumer bounded queue.
//!
//! Both ends coordinate via CAS/fetch-add claims on their respective
//! cursors; this is the fully general case and the other three variants
//! are specializations of it.

use std::sync::Arc;

use crate::error::{ RingflowError, Result };
use crate::queue::core::RingCore;

/// A multi-producer / multi-consumer bounded queue.
pub struct MpmcQueue<T> {
    core: Arc<RingCore<T>>,
}

impl<T> MpmcQueue<T> {
    pub fn create(capacity: usize) -> Result<Self> {
        Ok(Self { core: Arc::new(RingCore::new(capacity)?) })
    }

    pub fn close(&self) {
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Obtain a new sender handle. Any number of senders may be attached.
    pub fn get_sender(&self) -> Result<Sender<T>> {
        self.core.attach_producer(false)?;
        Ok(Sender { core: self.core.clone() })
    }

    /// Obtain a new receiver handle. Any number of receivers may be attached.
    pub fn get_receiver(&self) -> Result<Receiver<T>> {
        self.core.attach_consumer(false)?;
        Ok(Receiver { core: self.core.clone() })
    }

    pub fn destroy(self) {
        self.core.close();
        self.core.wait_drained();
    }
}

/// One producer handle for an [`MpmcQueue`].
pub struct Sender<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Sender<T> {
    #[inline]
    pub fn send(&self, value: T) -> Result<()> {
        self.core.send_multi_producer(value)
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

/// One consumer handle for an [`MpmcQueue`].
pub struct Receiver<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Receiver<T> {
    #[inline]
    pub fn recv(&self) -> Result<T> {
        self.core.recv_multi_consumer()
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
    use std::thread;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    #[test]
    fn test_round_trip() {
        let q = MpmcQueue::<u64>::create(8).unwrap();
        let tx = q.get_sender().unwrap();
        let rx = q.get_receiver().unwrap();
        for i in 0..8u64 {
            tx.send(i).unwrap();
        }
        let mut sum = 0;
        for _ in 0..8u64 {
            sum += rx.recv().unwrap();
        }
        assert_eq!(sum, (0..8u64).sum::<u64>());
    }

    /// capacity=16, send 100, close, two consumers drain concurrently:
    /// exactly 100 elements delivered in total, and any further recv
    /// after drain returns Closed.
    ///
    /// With only 16 slots, `send` blocks the producer until a consumer
    /// frees one up, so the consumers must be running before (and while)
    /// the producer is still sending — otherwise the 17th send spins
    /// forever against a queue nobody is draining.
    #[test]
    fn test_drain_on_close_exact_count() {
        let q = Arc::new(MpmcQueue::<u64>::create(16).unwrap());
        let tx = q.get_sender().unwrap();

        let received_count = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let q = q.clone();
            let received_count = received_count.clone();
            handles.push(
                thread::spawn(move || {
                    let rx = q.get_receiver().unwrap();
                    loop {
                        match rx.recv() {
                            Ok(_) => {
                                received_count.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(RingflowError::Closed) => break,
                            Err(_) => thread::yield_now(),
                        }
                    }
                })
            );
        }

        let producer = {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..100u64 {
                    tx.send(i).unwrap();
                }
                q.close();
            })
        };
        producer.join().unwrap();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(received_count.load(Ordering::SeqCst), 100);

        let rx = q.get_receiver().unwrap();
        assert!(matches!(rx.recv(), Err(RingflowError::Closed)));
    }

    #[test]
    fn test_many_producers_many_consumers() {
        let q = Arc::new(MpmcQueue::<u64>::create(64).unwrap());

        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 2_000;
        const TOTAL: u64 = PRODUCERS * PER_PRODUCER;

        let mut producer_handles = Vec::new();
        for _ in 0..PRODUCERS {
            let q = q.clone();
            producer_handles.push(
                thread::spawn(move || {
                    let tx = q.get_sender().unwrap();
                    for i in 0..PER_PRODUCER {
                        tx.send(i).unwrap();
                    }
                })
            );
        }

        let received_count = Arc::new(AtomicUsize::new(0));
        let mut consumer_handles = Vec::new();
        for _ in 0..4 {
            let q = q.clone();
            let received_count = received_count.clone();
            consumer_handles.push(
                thread::spawn(move || {
                    let rx = q.get_receiver().unwrap();
                    loop {
                        match rx.recv() {
                            Ok(_) => {
                                received_count.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(RingflowError::Closed) => break,
                            Err(_) => thread::yield_now(),
                        }
                    }
                })
            );
        }

        for h in producer_handles {
            h.join().unwrap();
        }
        q.close();
        for h in consumer_handles {
            h.join().unwrap();
        }

        assert_eq!(received_count.load(Ordering::SeqCst), TOTAL as usize);
    }
}
