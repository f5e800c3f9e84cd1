//! A work-stealing [`Algorithm`]: each worker owns a Chase-Lev deque
//! (`crossbeam_deque::Worker`), pushes/pops its own end LIFO, and idle peers
//! steal from the other end FIFO. Grounded in `crossbeam-deque`, the
//! current incarnation of the same deque `coio-rs` vendored (as the `deque`
//! crate) for exactly this purpose.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_deque::{Injector, Steal, Stealer, Worker};

use super::algorithm::Algorithm;
use super::parker::Parker;
use crate::fiber::Fiber;

/// Shared among every [`WorkStealing`] instance in the same pool: the
/// overflow injector queue and every worker's stealer handle.
pub struct Registry {
    injector: Injector<Box<Fiber>>,
    stealers: Mutex<Vec<Stealer<Box<Fiber>>>>,
    parker: Arc<Parker>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            injector: Injector::new(),
            stealers: Mutex::new(Vec::new()),
            parker: Arc::new(Parker::new()),
        })
    }

    /// Pushes a fiber onto the shared overflow queue (used when dispatching
    /// from a thread that has no local `WorkStealing` worker of its own) and
    /// wakes one idle peer.
    pub fn inject(&self, fiber: Box<Fiber>) {
        self.injector.push(fiber);
        self.parker.wake();
    }

    pub(crate) fn parker(&self) -> Arc<Parker> {
        self.parker.clone()
    }
}

pub struct WorkStealing {
    local: Worker<Box<Fiber>>,
    registry: Arc<Registry>,
}

impl WorkStealing {
    /// Registers a new local deque with `registry` and returns the
    /// algorithm that owns it. Must be called once per worker thread.
    pub fn new(registry: Arc<Registry>) -> Self {
        let local = Worker::new_lifo();
        registry.stealers.lock().unwrap().push(local.stealer());
        Self { local, registry }
    }

    pub(crate) fn parker(&self) -> Arc<Parker> {
        self.registry.parker()
    }
}

impl Algorithm for WorkStealing {
    fn awakened(&mut self, fiber: Box<Fiber>) {
        self.local.push(fiber);
    }

    fn pick_next(&mut self) -> Option<Box<Fiber>> {
        if let Some(fiber) = self.local.pop() {
            return Some(fiber);
        }
        loop {
            match self.registry.injector.steal_batch_and_pop(&self.local) {
                Steal::Success(fiber) => return Some(fiber),
                Steal::Retry => continue,
                Steal::Empty => break,
            }
        }
        let stealers = self.registry.stealers.lock().unwrap();
        loop {
            let mut retry = false;
            for stealer in stealers.iter() {
                match stealer.steal() {
                    Steal::Success(fiber) => return Some(fiber),
                    Steal::Retry => retry = true,
                    Steal::Empty => {}
                }
            }
            if !retry {
                return None;
            }
        }
    }

    fn has_ready_fibers(&self) -> bool {
        !self.local.is_empty() || !self.registry.injector.is_empty()
    }

    fn suspend_until(&mut self, deadline: Option<Instant>) {
        self.registry.parker.park(deadline);
    }

    fn notify(&self) {
        self.registry.parker.wake();
    }
}
