//! ringflow — bounded lock-free queues, epoch-reset arenas, and a job
//! scheduler for fixed thread-pool engines.
//!
//! - [`queue`] — SPSC/MPSC/SPMC/MPMC bounded queues sharing one
//!   slot-sequence protocol.
//! - [`arena`] — a flat bump arena and a segmented, epoch-reset region
//!   arena.
//! - [`sync`] — a busy-wait `WaitGroup`.
//! - [`scheduler`] — a fixed worker pool and a job scheduler with
//!   continuations, chains, and automatic arena recycling.
//!
//! Everything here is spin-based: there are no mutexes, condvars, or other
//! OS blocking primitives anywhere in the crate. Callers that need to wait
//! pay for it in CPU, not in context switches.

pub mod arena;
pub mod constants;
pub mod cpu;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod sync;

pub use error::{ Result, RingflowError };
