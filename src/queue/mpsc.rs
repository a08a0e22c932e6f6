//! Multi-producer / single-consumer bounded queue.
//!
//! Producers coordinate via a CAS loop on the shared producer cursor,
//! rechecking `Closed` on every attempt so none of them claims a slot
//! without first verifying the channel is still open.

use std::sync::Arc;

use crate::error::{ RingflowError, Result };
use crate::queue::core::RingCore;

/// A multi-producer / single-consumer bounded queue.
pub struct MpscQueue<T> {
    core: Arc<RingCore<T>>,
}

impl<T> MpscQueue<T> {
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

    /// Obtain the (unique) receiver handle.
    pub fn get_receiver(&self) -> Result<Receiver<T>> {
        self.core.attach_consumer(true)?;
        Ok(Receiver { core: self.core.clone() })
    }

    pub fn destroy(self) {
        self.core.close();
        self.core.wait_drained();
    }
}

/// One producer handle for an [`MpscQueue`].
pub struct Sender<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Sender<T> {
    /// Busy-wait for a free slot (CAS-claim among producers), then write
    /// and publish. Returns `Closed` if the queue closes during the wait.
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

/// The consumer side of an [`MpscQueue`].
pub struct Receiver<T> {
    core: Arc<RingCore<T>>,
}

impl<T> Receiver<T> {
    /// Non-blocking receive: `Empty` if nothing has been published yet.
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
