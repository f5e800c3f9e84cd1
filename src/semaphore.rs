//! Counting semaphores: a plain blocking one, and `FastSemaphore`, a
//! spin-then-block hybrid used by `crate::pool` to gate task admission
//! without paying a full suspend on the common uncontended path.

use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};

use crate::sync::waitlist::WaitList;

/// A standard counting semaphore: `acquire` blocks the calling fiber while
/// the count is zero, `release` increments it and wakes one waiter.
pub struct Semaphore {
    count: AtomicIsize,
    waiters: WaitList,
}

impl Semaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicIsize::new(initial as isize),
            waiters: WaitList::new(),
        }
    }

    pub fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            self.waiters.park();
        }
    }

    pub fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    pub fn release(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
        self.waiters.wake_one();
    }

    pub fn available_permits(&self) -> usize {
        self.count.load(Ordering::Acquire).max(0) as usize
    }
}

const SPIN_LIMIT: u32 = 32;

/// A semaphore tuned for the thread-pool's admission-control hot path: a
/// short busy-spin before falling back to [`WaitList::park`], plus an
/// `inactive` flag that, once set, makes every `acquire` succeed
/// immediately without consuming a permit — used by `crate::pool` during
/// shutdown so in-flight producers stop blocking on backpressure instead of
/// deadlocking against workers that are draining and about to exit.
pub struct FastSemaphore {
    count: AtomicIsize,
    waiters: WaitList,
    inactive: AtomicBool,
}

impl FastSemaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicIsize::new(initial as isize),
            waiters: WaitList::new(),
            inactive: AtomicBool::new(false),
        }
    }

    pub fn acquire(&self) {
        if self.inactive.load(Ordering::Acquire) {
            return;
        }
        let mut spins = 0;
        loop {
            if self.try_acquire() {
                return;
            }
            if self.inactive.load(Ordering::Acquire) {
                return;
            }
            if spins < SPIN_LIMIT {
                std::hint::spin_loop();
                spins += 1;
            } else {
                self.waiters.park();
            }
        }
    }

    pub fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    pub fn release(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
        self.waiters.wake_one();
    }

    /// Disables admission control: every future `acquire` returns
    /// immediately regardless of the permit count, and every fiber already
    /// parked in `acquire` is woken.
    pub fn deactivate(&self) {
        self.inactive.store(true, Ordering::Release);
        self.waiters.wake_all();
    }

    pub fn is_active(&self) -> bool {
        !self.inactive.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_blocks_until_release() {
        let sem = Semaphore::new(1);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        sem.release();
        assert!(sem.try_acquire());
    }

    #[test]
    fn fast_semaphore_deactivate_unblocks_future_acquires() {
        let sem = FastSemaphore::new(0);
        assert!(!sem.try_acquire());
        sem.deactivate();
        sem.acquire(); // would otherwise spin/park forever
        assert!(!sem.is_active());
    }
}
