//! A one-shot countdown latch, grounded in
//! `boost/task/spin/count_down_event.hpp`: construct with an initial count,
//! `count_down()` it to zero, `wait()` blocks until it reaches zero.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sync::waitlist::WaitList;

pub struct CountDownEvent {
    initial: usize,
    remaining: AtomicUsize,
    waiters: WaitList,
}

impl CountDownEvent {
    pub fn new(count: usize) -> Self {
        Self {
            initial: count,
            remaining: AtomicUsize::new(count),
            waiters: WaitList::new(),
        }
    }

    /// Decrements the count by one, waking every blocked waiter if it
    /// reaches zero. Decrementing past zero is a no-op.
    pub fn count_down(&self) {
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) if current == 1 => {
                    self.waiters.wake_all();
                    return;
                }
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn wait(&self) {
        while self.remaining.load(Ordering::Acquire) != 0 {
            self.waiters.park();
        }
    }

    /// The count this latch was constructed with.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// The count remaining right now.
    pub fn current(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_returns_immediately_once_count_reaches_zero() {
        let latch = CountDownEvent::new(2);
        assert_eq!(latch.initial(), 2);
        latch.count_down();
        assert_eq!(latch.current(), 1);
        latch.count_down();
        assert_eq!(latch.current(), 0);
        latch.wait();
    }

    #[test]
    fn counting_down_past_zero_is_a_no_op() {
        let latch = CountDownEvent::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.current(), 0);
    }
}
