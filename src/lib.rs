pub mod error;

mod naive;
mod pool;

pub use naive::NaiveThreadPool;
pub use pool::QueueThreadPool;

use crate::error::Result;

/// A queued unit of work. Ownership moves from the producer to the queue,
/// then to the worker that runs it.
pub type Job = Box<dyn Send + FnOnce() + 'static>;

pub trait ThreadPool {
    fn new(size: usize) -> Result<Self>
    where
        Self: Sized;

    fn execute<F>(&self, job: F) -> Result<()>
    where
        // since function works in a thread, it must have static lifetime
        F: Send + FnOnce() + 'static;
}
