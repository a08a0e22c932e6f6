//! Single-producer / multi-consumer bounded queue.
//!
//! Consumers coordinate via a fetch-add claim on the shared consumer
//! cursor, busy-waiting on the claimed slot's sequence number until the
//! producer publishes it (or the queue closes and drains).

use std::sync::Arc;

use crate::error::{ RingflowError, Result };
use crate::queue::core::RingCore;

/// A single-producer / multi-consumer bounded queue.
pub struct SpmcQueue<T> {
    core: Arc<RingCore<T>>,
}

impl<T> SpmcQueue<T> {
    pub fn create(capacity: usize) -> Result<Self> {
        Ok(Self { core: Arc::new(RingCore::new(capacity)?) })
    }

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

/// The producer side of an [`SpmcQueue`].
pub struct Sender<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Sender<T> {
    /// Send an element. Unlike SPSC, there is no single-consumer-tail
    /// shortcut available, so this busy-waits on the claimed slot rather
    /// than returning `Full` eagerly.
    #[inline]
    pub fn send(&self, value: T) -> Result<()> {
        self.core.send_single_producer_blocking(value)
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

/// One consumer handle for an [`SpmcQueue`].
pub struct Receiver<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Receiver<T> {
    /// Claim the next slot among all consumers and busy-wait for the
    /// producer to publish it. Returns `Closed` if the queue closes and
    /// drains while waiting.
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
