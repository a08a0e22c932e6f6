//! Minimal synchronization primitives used by the job scheduler.

pub mod wait_group;

pub use wait_group::WaitGroup;
