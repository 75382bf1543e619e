use crate::error::Result;
use crate::{Job, ThreadPool};
use slog::{debug, o, Discard, Logger};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

// everything shared between pool and workers sits behind one lock
struct PoolState {
    jobs: VecDeque<Job>,
    // workers currently idle-blocked, used to detect quiescence
    waiting: usize,
    paused: bool,
    terminate: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    // workers block here while there is nothing they may run
    jobs_available: Condvar,
    // broadcast on every change of `waiting`
    state_changed: Condvar,
}

/// A fixed-size pool of worker threads consuming jobs from a shared FIFO
/// queue. The worker count never changes after construction; a job that
/// panics kills its worker and permanently shrinks effective capacity by
/// one (see [`ThreadPool::execute`]).
pub struct QueueThreadPool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
    logger: Logger,
}

impl ThreadPool for QueueThreadPool {
    fn new(size: usize) -> Result<Self>
    where
        Self: Sized,
    {
        QueueThreadPool::with_logger(size, Logger::root(Discard, o!()))
    }

    /// Queues `job` and wakes one idle worker. Fire-and-forget: nothing is
    /// returned to the producer and execution is not protected, so a panic
    /// inside `job` unwinds through the worker thread running it.
    fn execute<F>(&self, job: F) -> Result<()>
    where
        // since function works in a thread, it must have static lifetime
        F: Send + FnOnce() + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        state.jobs.push_back(Box::new(job));
        self.shared.jobs_available.notify_one();
        Ok(())
    }
}

impl QueueThreadPool {
    /// Spawns exactly `size` workers, each starting out idle. `size == 0`
    /// is legal and yields a pool that accepts jobs but never runs them.
    pub fn with_logger(size: usize, logger: Logger) -> Result<QueueThreadPool> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                waiting: 0,
                paused: false,
                terminate: false,
            }),
            jobs_available: Condvar::new(),
            state_changed: Condvar::new(),
        });

        let mut pool = QueueThreadPool {
            shared,
            workers: Vec::with_capacity(size),
            logger,
        };
        for id in 0..size {
            // on spawn failure `?` drops the half-built pool, which stops
            // and joins the workers spawned so far
            let worker = Worker::new(
                id,
                Arc::clone(&pool.shared),
                pool.logger.new(o!("worker" => id)),
            )?;
            pool.workers.push(worker);
        }
        debug!(pool.logger, "pool started"; "threads" => size);

        Ok(pool)
    }

    /// The fixed worker count, constant for the pool's life even after a
    /// panicking job has killed a worker.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Snapshot of the pending job count; immediately stale under
    /// concurrent activity, treat it as advisory.
    pub fn waiting_jobs(&self) -> usize {
        self.shared.state.lock().unwrap().jobs.len()
    }

    /// Identities of the workers, in spawn order, stable for the pool's
    /// lifetime.
    pub fn ids(&self) -> Vec<ThreadId> {
        self.workers.iter().map(|worker| worker.id).collect()
    }

    /// Discards every job not yet picked up by a worker. Jobs already
    /// dequeued run to completion.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock().unwrap();
        let discarded = state.jobs.len();
        state.jobs.clear();
        debug!(self.logger, "queue cleared"; "discarded" => discarded);
    }

    /// `pause(true)` stops workers from dequeuing further jobs once their
    /// current one finishes; queued jobs are retained. `pause(false)`
    /// resumes and blocks until at least one worker has left the idle
    /// state, so resumption has visibly begun before it returns. That
    /// block is unbounded: resuming an empty queue waits for the next
    /// submission, and resuming a pool with no workers never returns.
    pub fn pause(&self, pause: bool) {
        let mut state = self.shared.state.lock().unwrap();
        state.paused = pause;
        debug!(self.logger, "pause toggled"; "paused" => pause);

        if !pause {
            self.shared.jobs_available.notify_all();

            // block until at least one worker has picked work back up
            while state.waiting == self.workers.len() {
                state = self.shared.state_changed.wait(state).unwrap();
            }
        }
    }

    /// Blocks until every worker is idle with nothing left to pick up.
    /// Concurrent producers can race with the return; this is not an
    /// exclusive barrier against them.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.waiting != self.workers.len() {
            state = self.shared.state_changed.wait(state).unwrap();
        }
    }

    /// Bounded variant of [`wait`](QueueThreadPool::wait). Returns `true`
    /// if the pool went quiescent before `timeout` elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let mut state = self.shared.state.lock().unwrap();
        while state.waiting != self.workers.len() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .state_changed
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
        true
    }
}

// destroy threads when pool is dead
impl Drop for QueueThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            // queued jobs never start once destruction begins
            state.jobs.clear();
            state.terminate = true;
            self.shared.jobs_available.notify_all();
            self.shared.state_changed.notify_all();
        }

        // in-flight jobs finish naturally before their worker exits
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                // a worker killed by a panicking job joins as Err
                let _ = thread.join();
            }
        }
        debug!(self.logger, "pool terminated");
    }
}

struct Worker {
    id: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, shared: Arc<Shared>, logger: Logger) -> Result<Worker> {
        let thread = thread::Builder::new()
            .name(format!("workpool-worker-{}", id))
            .spawn(move || do_jobs(shared, logger))?;

        Ok(Worker {
            id: thread.thread().id(),
            thread: Some(thread),
        })
    }
}

// consume and run jobs until told to terminate
fn do_jobs(shared: Arc<Shared>, logger: Logger) {
    loop {
        let mut state = shared.state.lock().unwrap();
        if state.terminate {
            break;
        }

        // nothing runnable, go into waiting mode
        if state.jobs.is_empty() || state.paused {
            state.waiting += 1;
            shared.state_changed.notify_all();
            state = shared
                .jobs_available
                .wait_while(state, |state| {
                    !state.terminate && (state.jobs.is_empty() || state.paused)
                })
                .unwrap();
            state.waiting -= 1;
            shared.state_changed.notify_all();
        }

        // last check before grabbing a job
        if state.terminate {
            break;
        }

        let job = match state.jobs.pop_front() {
            Some(job) => job,
            None => continue,
        };
        drop(state);

        job();
    }
    debug!(logger, "worker exiting");
}
