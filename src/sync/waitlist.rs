//! Shared blocking primitive used by every sync type in this module plus
//! `crate::channel` and `crate::future`.
//!
//! Every wait in this crate needs to work both inside a fiber (suspend
//! cooperatively, let the scheduler run other ready fibers) and on a plain
//! OS thread with no scheduler attached (park the thread). `WaitList` is the
//! one place that distinction is made; everything built on top of it just
//! calls `park`/`wake_one`/`wake_all`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread::Thread;

use crate::error::Result;
use crate::fiber::interrupt::interruption_point;
use crate::fiber::{this_fiber, FiberId};

enum Waiter {
    Fiber(FiberId),
    Thread(Thread),
}

#[derive(Default)]
pub(crate) struct WaitList {
    waiters: Mutex<VecDeque<Waiter>>,
}

impl WaitList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the calling fiber or thread as a waiter and suspends it.
    ///
    /// Callers must release any lock guarding their predicate before
    /// calling this, and must re-check the predicate in a loop after
    /// returning — like a condition variable, a wakeup here is not a
    /// guarantee the predicate now holds.
    pub(crate) fn park(&self) {
        if let Some(id) = this_fiber::current() {
            self.waiters.lock().unwrap().push_back(Waiter::Fiber(id));
            this_fiber::wait();
        } else {
            self.waiters
                .lock()
                .unwrap()
                .push_back(Waiter::Thread(std::thread::current()));
            std::thread::park();
        }
    }

    /// Like [`Self::park`], but checked against cooperative interruption
    /// once woken — the shape spec'd for channel `put`/`take` and other
    /// named interruption points. Plain sync primitives (`Mutex`, `Barrier`,
    /// `Event`) use [`Self::park`] instead and are never interrupted, same
    /// as their `std::sync` counterparts.
    pub(crate) fn park_interruptible(&self) -> Result<()> {
        self.park();
        interruption_point()
    }

    pub(crate) fn wake_one(&self) {
        if let Some(w) = self.waiters.lock().unwrap().pop_front() {
            wake(w);
        }
    }

    pub(crate) fn wake_all(&self) {
        let drained: Vec<_> = self.waiters.lock().unwrap().drain(..).collect();
        for w in drained {
            wake(w);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }
}

fn wake(waiter: Waiter) {
    match waiter {
        Waiter::Fiber(id) => crate::scheduler::wake(id),
        Waiter::Thread(t) => t.unpark(),
    }
}
