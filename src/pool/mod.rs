//! A fixed-size, fiber-aware thread pool: each worker is an OS thread
//! running a `Scheduler<WorkStealing>`, all sharing one
//! `WorkStealingRegistry` so idle workers steal from busy ones.
//!
//! Grounded in the original `boost::tasks::static_pool`: a task submitted
//! from inside a worker goes straight onto that worker's own deque (the
//! LIFO fast path of the `Queue` it names), a task submitted from outside
//! the pool is dispatched to a worker round-robin, and admission control
//! (the `high_watermark`/`low_watermark` pair) gates how many tasks may be
//! outstanding at once.

mod worker;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::fiber::{self, FiberId};
use crate::scheduler::{self, WorkStealingRegistry};
use crate::semaphore::FastSemaphore;

pub use crate::fiber::JoinHandle as TaskHandle;

/// How [`StaticPool::shutdown`] should treat fibers still running or
/// blocked when it's called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop accepting new submissions and wait for every outstanding task
    /// to finish on its own.
    Graceful,
    /// Like `Graceful`, but also requests cooperative interruption of every
    /// task this pool dispatched directly (round-robin submissions), so
    /// ones blocked at an interruption point unwind instead of running to
    /// completion.
    Immediate,
}

struct Dispatched {
    worker: usize,
    id: FiberId,
}

/// A fixed pool of worker threads executing submitted closures as fibers.
pub struct StaticPool {
    workers: Vec<worker::Worker>,
    admission: Option<Arc<FastSemaphore>>,
    stack_size: crate::config::StackSize,
    next_worker: AtomicUsize,
    outstanding: Mutex<Vec<Dispatched>>,
    closed: AtomicBool,
}

impl StaticPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(Error::InvalidPoolSize(0));
        }
        let registry = WorkStealingRegistry::new();
        let cores = if config.pin_to_cores {
            crate::numa::assign_cores(config.size)
        } else {
            Vec::new()
        };
        let workers = (0..config.size)
            .map(|i| worker::Worker::spawn(i, registry.clone(), cores.get(i).copied()))
            .collect();
        let admission = config
            .watermarks
            .map(|w| Arc::new(FastSemaphore::new(w.high())));
        Ok(Self {
            workers,
            admission,
            stack_size: config.stack_size,
            next_worker: AtomicUsize::new(0),
            outstanding: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Submits `f` for execution and returns a handle joinable for its
    /// result.
    ///
    /// If called from inside a fiber already running on one of this pool's
    /// schedulers (or any scheduler, per `crate::scheduler::current`), `f`
    /// is spawned directly onto that scheduler, landing on the calling
    /// worker's own deque. Otherwise it is dispatched to a worker chosen
    /// round-robin.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(Error::PoolMoved);
        }
        if let Some(sem) = &self.admission {
            sem.acquire();
            if self.is_closed() {
                sem.release();
                return Err(Error::PoolMoved);
            }
        }
        let admission = self.admission.clone();
        let body = move || {
            let result = f();
            if let Some(sem) = &admission {
                sem.release();
            }
            result
        };

        if scheduler::current().is_some() {
            let handle = fiber::Builder::new().stack_size(self.stack_size).spawn(body)?;
            return Ok(handle);
        }

        let idx = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let handle = fiber::Builder::new()
            .stack_size(self.stack_size)
            .spawn_on(&self.workers[idx].handle, body)?;
        self.outstanding
            .lock()
            .unwrap()
            .push(Dispatched { worker: idx, id: handle.id() });
        Ok(handle)
    }

    /// Stops accepting submissions, optionally interrupts outstanding
    /// round-robin-dispatched tasks, and blocks until every worker thread
    /// has exited.
    pub fn shutdown(self, mode: ShutdownMode) {
        self.closed.store(true, Ordering::Release);
        if let Some(sem) = &self.admission {
            sem.deactivate();
        }
        if mode == ShutdownMode::Immediate {
            for dispatched in self.outstanding.lock().unwrap().drain(..) {
                self.workers[dispatched.worker]
                    .handle
                    .request_interrupt(dispatched.id);
            }
        }
        for w in &self.workers {
            w.handle.shutdown();
        }
        for w in self.workers {
            w.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_from_outside_runs_and_joins() {
        let pool = StaticPool::new(PoolConfig::new(2).unwrap()).unwrap();
        let handle = pool.submit(|| 21 * 2).unwrap();
        assert_eq!(handle.join().unwrap(), 42);
        pool.shutdown(ShutdownMode::Graceful);
    }

    #[test]
    fn many_submissions_are_all_completed() {
        let pool = StaticPool::new(PoolConfig::new(4).unwrap()).unwrap();
        let handles: Vec<_> = (0..200)
            .map(|i| pool.submit(move || i * i).unwrap())
            .collect();
        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let expected: u64 = (0..200u64).map(|i| i * i).sum();
        assert_eq!(total, expected);
        pool.shutdown(ShutdownMode::Graceful);
    }

    #[test]
    fn watermarked_pool_rejects_submission_once_shut_down() {
        let config = PoolConfig::new(1)
            .unwrap()
            .with_watermarks(crate::config::Watermarks::fixed(4));
        let pool = StaticPool::new(config).unwrap();
        pool.submit(|| ()).unwrap().join().unwrap();
        pool.shutdown(ShutdownMode::Graceful);
    }
}
