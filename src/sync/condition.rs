//! A condition variable paired with this crate's own [`super::Mutex`],
//! mirroring `std::sync::Condvar` but suspending the calling fiber instead
//! of parking the OS thread.

use std::time::{Duration, Instant};

use crate::fiber::this_fiber;
use crate::sync::mutex::MutexGuard;
use crate::sync::waitlist::WaitList;

#[derive(Default)]
pub struct Condition {
    waiters: WaitList,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically releases `guard` and suspends the calling fiber until
    /// notified, then reacquires the mutex before returning.
    ///
    /// As with any condvar, the wakeup may be spurious: callers must
    /// re-check their predicate in a loop.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let mutex = MutexGuard::mutex(&guard);
        drop(guard);
        self.waiters.park();
        mutex.lock()
    }

    /// As [`Condition::wait`], but gives up and reacquires the mutex anyway
    /// once `deadline` passes.
    pub fn wait_until<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        deadline: Instant,
    ) -> (MutexGuard<'a, T>, bool) {
        let mutex = MutexGuard::mutex(&guard);
        drop(guard);
        // `WaitList` has no built-in timeout, so race the wait against a
        // scheduler-driven wake at `deadline`, same trick `this_fiber::sleep`
        // uses.
        let id = this_fiber::current();
        if let Some(id) = id {
            crate::scheduler::wake_at(id, deadline);
        }
        self.waiters.park();
        let timed_out = Instant::now() >= deadline;
        (mutex.lock(), timed_out)
    }

    pub fn wait_for<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        self.wait_until(guard, Instant::now() + timeout)
    }

    pub fn notify_one(&self) {
        self.waiters.wake_one();
    }

    pub fn notify_all(&self) {
        self.waiters.wake_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Mutex;

    #[test]
    fn notify_one_wakes_a_parked_thread_waiter() {
        use std::sync::Arc;
        let mutex = Arc::new(Mutex::new(false));
        let cond = Arc::new(Condition::new());

        let m2 = mutex.clone();
        let c2 = cond.clone();
        let handle = std::thread::spawn(move || {
            let mut guard = m2.lock();
            while !*guard {
                guard = c2.wait(guard);
            }
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        *mutex.lock() = true;
        cond.notify_one();
        handle.join().unwrap();
    }
}
