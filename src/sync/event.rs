//! Manual-reset and auto-reset events.

use crate::sync::spinlock::SpinLock;
use crate::sync::waitlist::WaitList;

/// Stays signaled once set, until explicitly [`Event::reset`]. Any number of
/// waiters may observe a single `set()`.
#[derive(Default)]
pub struct Event {
    signaled: SpinLock<bool>,
    waiters: WaitList,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        *self.signaled.lock() = true;
        self.waiters.wake_all();
    }

    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }

    /// Blocks the calling fiber until the event is signaled. If it is
    /// already signaled, returns immediately.
    pub fn wait(&self) {
        loop {
            if *self.signaled.lock() {
                return;
            }
            self.waiters.park();
        }
    }
}

/// Signals exactly one waiter per `set()` call, then automatically resets —
/// like a binary semaphore. Matches `boost::fibers::event`'s auto-reset
/// variant.
#[derive(Default)]
pub struct AutoResetEvent {
    signaled: SpinLock<bool>,
    waiters: WaitList,
}

impl AutoResetEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let was_clear = {
            let mut signaled = self.signaled.lock();
            let was_clear = !*signaled;
            *signaled = true;
            was_clear
        };
        if was_clear {
            self.waiters.wake_one();
        }
    }

    /// Blocks until signaled, consuming the signal (the next waiter, if any,
    /// will block again until the next `set()`).
    pub fn wait(&self) {
        loop {
            {
                let mut signaled = self.signaled.lock();
                if *signaled {
                    *signaled = false;
                    return;
                }
            }
            self.waiters.park();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_reset_stays_signaled_for_every_observer() {
        let e = Event::new();
        e.set();
        e.wait();
        e.wait();
        assert!(e.is_set());
        e.reset();
        assert!(!e.is_set());
    }

    #[test]
    fn auto_reset_clears_after_one_wait() {
        let e = AutoResetEvent::new();
        e.set();
        e.wait();
        assert!(!*e.signaled.lock());
    }
}
