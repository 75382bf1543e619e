use crate::error::Result;
use crate::ThreadPool;
use std::thread;

/// Not a pool at all: spawns a fresh thread for every job. Kept as the
/// baseline the real pool is benchmarked against.
pub struct NaiveThreadPool;

impl ThreadPool for NaiveThreadPool {
    fn new(_size: usize) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(NaiveThreadPool)
    }

    fn execute<F>(&self, job: F) -> Result<()>
    where
        F: Send + FnOnce() + 'static,
    {
        thread::Builder::new().spawn(job)?;
        Ok(())
    }
}
