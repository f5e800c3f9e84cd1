//! Each worker thread in a pool runs exactly one `Scheduler`, cooperatively
//! multiplexing fibers onto that one OS thread. The scheduling *policy* is
//! pluggable (see [`Algorithm`]); this module is the mechanism: the ready /
//! waiting / sleeping bookkeeping and the cross-thread [`Handle`] other
//! threads use to inject fibers, wake waiters, and request interruption.

pub mod algorithm;
mod parker;
pub mod round_robin;
pub mod work_stealing;

pub use algorithm::Algorithm;
pub use round_robin::RoundRobin;
pub use work_stealing::{Registry as WorkStealingRegistry, WorkStealing};

use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_queue::SegQueue;
use once_cell::sync::Lazy;

use crate::context::{Suspend, Transfer};
use crate::error::{Error, Result};
use crate::fiber::{this_fiber, Fiber, FiberId};
use parker::Parker;

/// Implemented by the built-in [`Algorithm`]s so [`Scheduler::new`] can find
/// the `Parker` each one already owns internally and share it with the
/// cross-thread [`Handle`] — kept out of the public `Algorithm` trait since
/// it's plumbing, not scheduling policy.
pub(crate) trait ParkSource {
    fn parker_handle(&self) -> Arc<Parker>;
}

impl ParkSource for RoundRobin {
    fn parker_handle(&self) -> Arc<Parker> {
        self.parker()
    }
}

impl ParkSource for WorkStealing {
    fn parker_handle(&self) -> Arc<Parker> {
        self.parker()
    }
}

struct Shared {
    spawned: SegQueue<Box<Fiber>>,
    pending_wakes: Mutex<HashSet<FiberId>>,
    pending_timers: SegQueue<(Instant, FiberId)>,
    pending_interrupts: SegQueue<FiberId>,
    parker: Arc<Parker>,
    closed: Mutex<bool>,
}

/// A cheaply-clonable reference to a running [`Scheduler`], usable from any
/// thread to inject work, wake a waiting fiber, or request interruption.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl Handle {
    pub fn spawn(&self, fiber: Box<Fiber>) -> Result<()> {
        if *self.shared.closed.lock().unwrap() {
            return Err(Error::TaskRejected("scheduler is shutting down"));
        }
        self.shared.spawned.push(fiber);
        self.shared.parker.wake();
        Ok(())
    }

    pub fn wake(&self, id: FiberId) {
        self.shared.pending_wakes.lock().unwrap().insert(id);
        self.shared.parker.wake();
    }

    pub fn wake_at(&self, id: FiberId, deadline: Instant) {
        self.shared.pending_timers.push((deadline, id));
        self.shared.parker.wake();
    }

    pub fn request_interrupt(&self, id: FiberId) {
        self.shared.pending_interrupts.push(id);
        self.shared.parker.wake();
    }

    pub fn shutdown(&self) {
        *self.shared.closed.lock().unwrap() = true;
        self.shared.parker.wake();
    }
}

/// Drives one OS thread's fiber scheduling loop.
///
/// Construct with a chosen [`Algorithm`] (see [`RoundRobin`],
/// [`WorkStealing`]), then call [`Scheduler::run`] from the thread that
/// should host it — `run` does not return until every fiber has finished and
/// [`Handle::shutdown`] has been called, so it's meant to be the entire body
/// of a pool worker thread.
pub struct Scheduler<A: Algorithm + ParkSource> {
    algorithm: A,
    /// Fibers parked via `Suspend::Wait`, whether blocked on a sync
    /// primitive (woken through `pending_wakes`) or sleeping (woken through
    /// `timers`) — both end up here, they just differ in which cross-thread
    /// queue will move them back out.
    waiting: HashMap<FiberId, Box<Fiber>>,
    timers: BinaryHeap<Reverse<(Instant, FiberId)>>,
    shared: Arc<Shared>,
}

impl<A: Algorithm + ParkSource> Scheduler<A> {
    pub fn new(algorithm: A) -> Self {
        let parker = algorithm.parker_handle();
        let shared = Arc::new(Shared {
            spawned: SegQueue::new(),
            pending_wakes: Mutex::new(HashSet::new()),
            pending_timers: SegQueue::new(),
            pending_interrupts: SegQueue::new(),
            parker,
            closed: Mutex::new(false),
        });
        Self {
            algorithm,
            waiting: HashMap::new(),
            timers: BinaryHeap::new(),
            shared,
        }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            shared: self.shared.clone(),
        }
    }

    /// Runs the scheduling loop until there is no more work and shutdown has
    /// been requested. Installs `self`'s handle as the current thread's
    /// scheduler for the duration, so `fiber::spawn` and friends work from
    /// fiber bodies running on this thread.
    pub fn run(mut self) {
        let handle = self.handle();
        CURRENT.with(|c| c.set(Some(Box::into_raw(Box::new(handle)))));
        loop {
            self.drain_cross_thread_queues();
            match self.algorithm.pick_next() {
                Some(fiber) => self.resume(fiber),
                None => {
                    if self.should_stop() {
                        break;
                    }
                    let deadline = self.next_wakeup();
                    self.algorithm.suspend_until(deadline);
                }
            }
        }
        CURRENT.with(|c| {
            if let Some(ptr) = c.replace(None) {
                drop(unsafe { Box::from_raw(ptr) });
            }
        });
    }

    fn should_stop(&self) -> bool {
        *self.shared.closed.lock().unwrap()
            && self.waiting.is_empty()
            && !self.algorithm.has_ready_fibers()
    }

    fn next_wakeup(&self) -> Option<Instant> {
        self.timers.peek().map(|Reverse((when, _))| *when)
    }

    fn drain_cross_thread_queues(&mut self) {
        while let Some(fiber) = self.shared.spawned.pop() {
            self.algorithm.awakened(fiber);
        }
        {
            let mut wakes = self.shared.pending_wakes.lock().unwrap();
            for id in wakes.drain() {
                if let Some(fiber) = self.waiting.remove(&id) {
                    self.algorithm.awakened(fiber);
                }
            }
        }
        while let Some((deadline, id)) = self.shared.pending_timers.pop() {
            if self.waiting.contains_key(&id) {
                self.timers.push(Reverse((deadline, id)));
            }
        }
        while let Some(id) = self.shared.pending_interrupts.pop() {
            if let Some(fiber) = self.waiting.remove(&id) {
                // Interrupting a blocked fiber both sets its flag and wakes
                // it, so whatever `park_interruptible` call it's blocked in
                // gets a chance to observe the flag and return
                // `Err(Error::FiberInterrupted)`.
                fiber.request_interrupt();
                self.algorithm.awakened(fiber);
            }
        }
        let now = Instant::now();
        while matches!(self.timers.peek(), Some(Reverse((when, _))) if *when <= now) {
            let Reverse((_, id)) = self.timers.pop().unwrap();
            if let Some(fiber) = self.waiting.remove(&id) {
                self.algorithm.awakened(fiber);
            }
        }
    }

    fn resume(&mut self, mut fiber: Box<Fiber>) {
        let id = fiber.id();
        // Recorded before the jump, not after: the fiber body itself may
        // call `wait()` (via a sync primitive's waiter list) before this
        // call returns, and a concurrent signaller on another thread must
        // already see this scheduler as `id`'s owner at that point, not
        // whichever scheduler last ran it.
        register_owner(id, self.handle());
        let control_ptr = fiber.control_ptr();
        let transfer = this_fiber::enter(control_ptr, || fiber.jump());
        match transfer {
            Transfer::Suspended(Suspend::Yield) => self.algorithm.awakened(fiber),
            Transfer::Suspended(Suspend::Wait) => {
                // A wake for this id may have raced us between the fiber
                // choosing to wait and us recording it here; check before
                // parking it so the wakeup is never lost.
                if self.shared.pending_wakes.lock().unwrap().remove(&id) {
                    self.algorithm.awakened(fiber);
                } else {
                    self.waiting.insert(id, fiber);
                }
            }
            Transfer::Completed(()) => {
                forget_owner(id);
                log::trace!("{} completed", id);
            }
        }
    }
}

thread_local! {
    static CURRENT: Cell<Option<*mut Handle>> = const { Cell::new(None) };
}

fn with_current<R>(f: impl FnOnce(&Handle) -> R) -> Option<R> {
    CURRENT.with(|c| c.get()).map(|ptr| f(unsafe { &*ptr }))
}

/// The handle for the scheduler running on the current thread, if any.
pub fn current() -> Option<Handle> {
    with_current(|handle| handle.clone())
}

pub(crate) fn spawn_local(fiber: Box<Fiber>) -> Result<()> {
    with_current(|handle| handle.spawn(fiber)).unwrap_or(Err(Error::NoFiber))
}

/// Process-wide FiberId → owning-scheduler directory.
///
/// Every scheduler runs on its own OS thread with its own private `Shared`
/// queues, so a thread signalling a fiber that happens to be parked on a
/// *different* scheduler cannot reach it through its own `CURRENT` handle —
/// that would enqueue the wake on the wrong scheduler's queues, where it's
/// never looked up and silently dropped. Each scheduler registers (or
/// re-registers, on migration) the fiber it is about to resume here, so any
/// thread can look up the scheduler actually responsible for a given
/// `FiberId` before routing a wake, timer, or interrupt request to it.
static OWNERS: Lazy<Mutex<HashMap<FiberId, Handle>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn register_owner(id: FiberId, handle: Handle) {
    OWNERS.lock().unwrap().insert(id, handle);
}

fn forget_owner(id: FiberId) {
    OWNERS.lock().unwrap().remove(&id);
}

fn owner(id: FiberId) -> Option<Handle> {
    OWNERS.lock().unwrap().get(&id).cloned()
}

pub(crate) fn wake(id: FiberId) {
    match owner(id) {
        Some(handle) => handle.wake(id),
        None => log::warn!("scheduler::wake({}) called for an unknown fiber", id),
    }
}

pub(crate) fn wake_at(id: FiberId, deadline: Instant) {
    if let Some(handle) = owner(id) {
        handle.wake_at(id, deadline);
    }
}

pub(crate) fn sleep_until(id: FiberId, deadline: Instant) {
    if let Some(handle) = owner(id) {
        handle.wake_at(id, deadline);
    }
}

pub(crate) fn request_interrupt(id: FiberId) {
    if let Some(handle) = owner(id) {
        handle.request_interrupt(id);
    } else {
        log::warn!("scheduler::request_interrupt({}) called for an unknown fiber", id);
    }
}
