//! The job scheduler: spawn, continuations, chains, and epoch-based arena
//! recycling.

use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{ info, warn };

use crate::arena::RegionArena;
use crate::constants::{
    DEFAULT_MAX_REGIONS,
    DEFAULT_REGION_CAPACITY,
    HEALTHCHECK_GUARD_MARGIN,
};
use crate::cpu::pause;
use crate::error::{ RingflowError, Result };
use crate::queue::mpmc::{ MpmcQueue, Receiver, Sender };
use crate::scheduler::job::{ JobFn, JobHandle, JobSlot };

/// Tunables for [`Scheduler::spawn`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub num_threads: usize,
    /// Elements per arena region.
    pub region_capacity: usize,
    /// Maximum number of arena regions (bounds total in-flight job slots).
    pub max_regions: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            region_capacity: DEFAULT_REGION_CAPACITY,
            max_regions: DEFAULT_MAX_REGIONS,
        }
    }
}

struct SchedulerShared {
    arena: RegionArena<JobSlot>,
    accepting_jobs: AtomicBool,
    active_jobs: AtomicUsize,
    jobs_completed_epoch: AtomicUsize,
    max_jobs: usize,
}

/// A lock-free job scheduler built on a dedicated worker pool and a
/// [`RegionArena`] of [`JobSlot`]s.
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
    dispatcher: Sender<JobHandle>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the scheduler: allocate the job arena and spawn its dedicated
    /// worker threads around an MPMC dispatch queue sized to `max_jobs`.
    pub fn spawn(config: SchedulerConfig) -> Result<Self> {
        if config.num_threads == 0 {
            return Err(RingflowError::config("num_threads must be > 0"));
        }
        let max_jobs = config.region_capacity * config.max_regions;
        let shared = Arc::new(SchedulerShared {
            arena: RegionArena::create(config.region_capacity, config.max_regions)?,
            accepting_jobs: AtomicBool::new(true),
            active_jobs: AtomicUsize::new(0),
            jobs_completed_epoch: AtomicUsize::new(0),
            max_jobs,
        });

        let queue = MpmcQueue::<JobHandle>::create(max_jobs.next_power_of_two())?;
        let dispatcher = queue.get_sender()?;

        let mut workers = Vec::with_capacity(config.num_threads);
        for _ in 0..config.num_threads {
            let receiver = queue.get_receiver()?;
            let sender = queue.get_sender()?;
            let shared = shared.clone();
            workers.push(
                std::thread::spawn(move || {
                    worker_loop(shared, receiver, sender);
                })
            );
        }

        info!(num_threads = config.num_threads, max_jobs, "scheduler started");
        Ok(Self { shared, dispatcher, workers })
    }

    fn validate(&self, job: &JobHandle) -> Result<()> {
        if job.epoch != self.shared.arena.epoch() {
            return Err(RingflowError::Null);
        }
        Ok(())
    }

    /// Create a job from `f`. The job is not executed until scheduled via
    /// [`Scheduler::wait`], [`Scheduler::then`], or [`Scheduler::chain`].
    pub fn job_spawn<F>(&self, f: F) -> Result<JobHandle> where F: FnOnce() + Send + 'static {
        while !self.shared.accepting_jobs.load(Ordering::Acquire) {
            pause();
        }
        self.shared.active_jobs.fetch_add(1, Ordering::AcqRel);

        let index = match self.shared.arena.alloc() {
            Ok(i) => i,
            Err(e) => {
                self.shared.active_jobs.fetch_sub(1, Ordering::AcqRel);
                return Err(e);
            }
        };
        let slot = self.shared.arena.get(index).expect("just allocated");
        slot.install(Box::new(f) as JobFn);

        Ok(JobHandle { index, epoch: self.shared.arena.epoch() })
    }

    /// Schedule `then` to run immediately after `first` completes.
    pub fn job_then(&self, first: &JobHandle, then: &JobHandle) -> Result<()> {
        self.validate(first)?;
        self.validate(then)?;

        let first_slot = self.shared.arena.get(first.index).ok_or(RingflowError::Null)?;
        let then_slot = self.shared.arena.get(then.index).ok_or(RingflowError::Null)?;

        first_slot.continuation.store(then.index, Ordering::Release);
        then_slot.unfinished.fetch_add(1, Ordering::Release);

        self.schedule(&self.dispatcher, first)
    }

    /// Chain jobs to run sequentially in array order, then schedule the
    /// first for execution.
    pub fn job_chain(&self, jobs: &[JobHandle]) -> Result<()> {
        let Some((first, rest)) = jobs.split_first() else {
            return Ok(());
        };
        self.validate(first)?;

        let mut prev = *first;
        for job in rest {
            self.validate(job)?;
            let prev_slot = self.shared.arena.get(prev.index).ok_or(RingflowError::Null)?;
            let job_slot = self.shared.arena.get(job.index).ok_or(RingflowError::Null)?;
            prev_slot.continuation.store(job.index, Ordering::Release);
            job_slot.unfinished.fetch_add(1, Ordering::Release);
            prev = *job;
        }

        self.schedule(&self.dispatcher, first)
    }

    /// Schedule `job` for execution. Used for independent jobs, or as the
    /// entry point of a chain built with [`Scheduler::job_then`] /
    /// [`Scheduler::job_chain`].
    pub fn job_wait(&self, job: &JobHandle) -> Result<()> {
        self.validate(job)?;
        self.schedule(&self.dispatcher, job)
    }

    fn schedule(&self, sender: &Sender<JobHandle>, job: &JobHandle) -> Result<()> {
        let slot = self.shared.arena.get(job.index).ok_or(RingflowError::Null)?;
        if slot.unfinished.load(Ordering::Acquire) == 0 {
            return Ok(());
        }
        sender.send(*job)
    }

    /// Close the dispatch queue and join every worker thread.
    pub fn shutdown(mut self) {
        self.dispatcher.close();
        info!("scheduler shutting down");
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<SchedulerShared>, receiver: Receiver<JobHandle>, sender: Sender<JobHandle>) {
    loop {
        match receiver.recv() {
            Ok(job) => {
                if job.epoch != shared.arena.epoch() {
                    // Stale handle surviving a reset; treat as already consumed.
                    continue;
                }
                let Some(slot) = shared.arena.get(job.index) else {
                    continue;
                };
                if slot.unfinished.load(Ordering::Acquire) == 1 {
                    if let Some(func) = slot.take_func() {
                        func();
                    }
                    shared.jobs_completed_epoch.fetch_add(1, Ordering::Release);
                    slot.unfinished.fetch_sub(1, Ordering::Release);

                    let continuation = slot.continuation.load(Ordering::Acquire);
                    shared.active_jobs.fetch_sub(1, Ordering::AcqRel);

                    if continuation != crate::scheduler::job::NO_CONTINUATION {
                        if let Some(cont_slot) = shared.arena.get(continuation) {
                            cont_slot.unfinished.fetch_sub(1, Ordering::Release);
                            let cont_handle = JobHandle { index: continuation, epoch: job.epoch };
                            if cont_slot.unfinished.load(Ordering::Acquire) != 0 {
                                let _ = sender.send(cont_handle);
                            }
                        }
                    } else {
                        healthcheck(&shared);
                    }
                }
            }
            Err(RingflowError::Closed) => {
                break;
            }
            Err(_) => std::thread::yield_now(),
        }
    }
}

fn healthcheck(shared: &Arc<SchedulerShared>) {
    let completed = shared.jobs_completed_epoch.load(Ordering::Acquire);
    if completed > shared.max_jobs.saturating_sub(HEALTHCHECK_GUARD_MARGIN) {
        warn!(completed, max_jobs = shared.max_jobs, "job arena nearing capacity, resetting epoch");
        reset(shared);
    }
}

fn reset(shared: &Arc<SchedulerShared>) {
    shared.accepting_jobs.store(false, Ordering::Release);
    while shared.active_jobs.load(Ordering::Acquire) != 0 {
        pause();
    }
    shared.arena.reset();
    shared.jobs_completed_epoch.store(0, Ordering::Release);
    shared.accepting_jobs.store(true, Ordering::Release);
    info!("job arena epoch reset complete");
}
