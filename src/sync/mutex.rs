//! A fiber-aware mutual-exclusion lock.
//!
//! Blocking a whole OS thread on contention would also block every other
//! fiber scheduled on it, so `lock()` suspends only the calling fiber (via
//! [`super::waitlist::WaitList`]) and lets the scheduler run other ready
//! work in the meantime. Debug builds record the call site of the current
//! holder, the same `#[track_caller]` diagnostic `tarantool::fiber::Mutex`
//! uses to make "who's holding this lock" reportable.

use std::cell::UnsafeCell;
use std::panic::Location;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::fiber::{this_fiber, FiberId};
use crate::sync::spinlock::SpinLock;
use crate::sync::waitlist::WaitList;

struct State {
    locked: bool,
    owner: Option<FiberId>,
    #[cfg(debug_assertions)]
    location: Option<&'static Location<'static>>,
}

/// A non-reentrant mutex safe to lock from within a fiber.
///
/// Locking from the same fiber twice deadlocks (use
/// [`super::RecursiveMutex`] if that's needed); locking from a plain OS
/// thread with no fiber scheduler attached falls back to parking the
/// thread, so the type works the same outside a pool worker.
pub struct Mutex<T> {
    state: SpinLock<State>,
    waiters: WaitList,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: SpinLock::new(State {
                locked: false,
                owner: None,
                #[cfg(debug_assertions)]
                location: None,
            }),
            waiters: WaitList::new(),
            value: UnsafeCell::new(value),
        }
    }

    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            self.waiters.park();
        }
    }

    #[track_caller]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let mut state = self.state.lock();
        if state.locked {
            return None;
        }
        state.locked = true;
        state.owner = this_fiber::current();
        #[cfg(debug_assertions)]
        {
            state.location = Some(Location::caller());
        }
        Some(MutexGuard { mutex: self })
    }

    /// Polls for the lock until `deadline`, sleeping the calling fiber
    /// briefly between attempts. Mirrors `boost::fibers::timed_mutex`.
    #[track_caller]
    pub fn try_lock_until(&self, deadline: Instant) -> Result<MutexGuard<'_, T>> {
        const POLL_INTERVAL: Duration = Duration::from_micros(200);
        loop {
            if let Some(guard) = self.try_lock() {
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(Error::Lock("try_lock_until timed out"));
            }
            this_fiber::sleep_for(POLL_INTERVAL.min(deadline - Instant::now()));
        }
    }

    #[track_caller]
    pub fn try_lock_for(&self, timeout: Duration) -> Result<MutexGuard<'_, T>> {
        self.try_lock_until(Instant::now() + timeout)
    }

    /// Description of the current holder's lock call site, for diagnostics
    /// (debug builds only; always `None` in release).
    pub fn held_at(&self) -> Option<String> {
        #[cfg(debug_assertions)]
        {
            self.state.lock().location.map(|l| l.to_string())
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }

    fn unlock(&self) {
        {
            let mut state = self.state.lock();
            state.locked = false;
            state.owner = None;
            #[cfg(debug_assertions)]
            {
                state.location = None;
            }
        }
        self.waiters.wake_one();
    }
}

pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<'a, T> MutexGuard<'a, T> {
    /// Exposes the guard's mutex so `Condition` can release and reacquire
    /// it around a wait without this guard type needing to be `Copy`.
    pub(crate) fn mutex(guard: &MutexGuard<'a, T>) -> &'a Mutex<T> {
        guard.mutex
    }
}

impl<T> std::ops::Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> std::ops::DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_excludes_try_lock() {
        let m = Mutex::new(0);
        let guard = m.lock();
        assert!(m.try_lock().is_none());
        drop(guard);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn guard_mutates_value() {
        let m = Mutex::new(vec![1, 2]);
        m.lock().push(3);
        assert_eq!(*m.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn try_lock_for_times_out_while_held() {
        let m = Mutex::new(());
        let _guard = m.lock();
        let err = m.try_lock_for(Duration::from_millis(1));
        assert!(err.is_err());
    }
}
