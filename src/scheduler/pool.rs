//! A general-purpose fixed thread pool dispatching arbitrary closures over
//! a shared MPMC queue.

use std::thread::JoinHandle;

use tracing::{ debug, info };

use crate::error::{ Result, RingflowError };
use crate::queue::mpmc::{ MpmcQueue, Receiver, Sender };

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed pool of OS worker threads draining a shared MPMC dispatch queue.
///
/// The dispatch channel has capacity `num_threads * 4`, and each worker
/// holds its own sender alongside a shared receiver, so it can re-enqueue
/// work the way the scheduler's own workers re-enqueue continuations.
pub struct ThreadPool {
    dispatcher: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `num_threads` workers around a fresh MPMC dispatch queue.
    pub fn init(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(RingflowError::config("num_threads must be > 0"));
        }
        let queue = MpmcQueue::<Job>::create((num_threads * 4).next_power_of_two())?;
        let dispatcher = queue.get_sender()?;

        let mut workers = Vec::with_capacity(num_threads);
        for id in 0..num_threads {
            let receiver = queue.get_receiver()?;
            let sender = queue.get_sender()?;
            workers.push(
                std::thread::spawn(move || {
                    worker_loop(id, receiver, sender);
                })
            );
        }
        info!(num_threads, "thread pool started");
        Ok(Self { dispatcher, workers })
    }

    /// Submit a job for execution by the next available worker.
    pub fn execute<F>(&self, f: F) -> Result<()> where F: FnOnce() + Send + 'static {
        self.dispatcher.send(Box::new(f))
    }

    /// Close the dispatch queue and join every worker thread.
    pub fn shutdown(mut self) {
        self.dispatcher.close();
        info!("thread pool shutting down");
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(id: usize, receiver: Receiver<Job>, sender: Sender<Job>) {
    loop {
        match receiver.recv() {
            Ok(job) => {
                job();
            }
            Err(RingflowError::Closed) => {
                break;
            }
            Err(_) => std::thread::yield_now(),
        }
    }
    debug!(worker = id, "worker exiting");
    drop(sender);
}
