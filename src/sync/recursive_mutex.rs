//! A mutex the same fiber may lock more than once.

use std::cell::UnsafeCell;

use crate::fiber::{this_fiber, FiberId};
use crate::sync::spinlock::SpinLock;
use crate::sync::waitlist::WaitList;

struct State {
    owner: Option<FiberId>,
    depth: u32,
}

pub struct RecursiveMutex<T> {
    state: SpinLock<State>,
    waiters: WaitList,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for RecursiveMutex<T> {}
unsafe impl<T: Send> Sync for RecursiveMutex<T> {}

impl<T> RecursiveMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: SpinLock::new(State {
                owner: None,
                depth: 0,
            }),
            waiters: WaitList::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> RecursiveMutexGuard<'_, T> {
        let current = this_fiber::current();
        loop {
            {
                let mut state = self.state.lock();
                if state.depth == 0 || state.owner == current {
                    state.owner = current;
                    state.depth += 1;
                    return RecursiveMutexGuard { mutex: self };
                }
            }
            self.waiters.park();
        }
    }

    pub fn try_lock(&self) -> Option<RecursiveMutexGuard<'_, T>> {
        let current = this_fiber::current();
        let mut state = self.state.lock();
        if state.depth == 0 || state.owner == current {
            state.owner = current;
            state.depth += 1;
            Some(RecursiveMutexGuard { mutex: self })
        } else {
            None
        }
    }

    fn unlock(&self) {
        let released = {
            let mut state = self.state.lock();
            state.depth -= 1;
            if state.depth == 0 {
                state.owner = None;
                true
            } else {
                false
            }
        };
        if released {
            self.waiters.wake_one();
        }
    }
}

pub struct RecursiveMutexGuard<'a, T> {
    mutex: &'a RecursiveMutex<T>,
}

impl<T> std::ops::Deref for RecursiveMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> std::ops::DerefMut for RecursiveMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Drop for RecursiveMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_fiber_can_relock_when_run_outside_a_fiber() {
        // Outside a fiber, `this_fiber::current()` is `None` for both calls,
        // so the "same owner" check still holds and nesting succeeds.
        let m = RecursiveMutex::new(0);
        let outer = m.lock();
        let inner = m.try_lock();
        assert!(inner.is_some());
        drop(inner);
        drop(outer);
    }
}
