//! An unbounded MPMC channel: no admission control, `put` never blocks.
//! Grounded in the Michael-Scott two-lock queue design `boost::fibers`'
//! unbuffered/unbounded channel variants use; we get the same shape for
//! free from a `Mutex`-guarded `VecDeque` since contention here is expected
//! to be low relative to a lock-free queue's added complexity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{RecvError, SendError, TryRecvError};
use crate::sync::waitlist::WaitList;

struct Inner<T> {
    queue: Mutex<VecDeque<T>>,
    waiters: WaitList,
    senders: AtomicUsize,
    receivers: AtomicUsize,
    active: AtomicBool,
}

pub struct UnboundedSender<T> {
    inner: Arc<Inner<T>>,
}

pub struct UnboundedReceiver<T> {
    inner: Arc<Inner<T>>,
}

pub fn unbounded<T>() -> (UnboundedSender<T>, UnboundedReceiver<T>) {
    let inner = Arc::new(Inner {
        queue: Mutex::new(VecDeque::new()),
        waiters: WaitList::new(),
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
        active: AtomicBool::new(true),
    });
    (
        UnboundedSender {
            inner: inner.clone(),
        },
        UnboundedReceiver { inner },
    )
}

impl<T> Inner<T> {
    /// Deactivation is monotonic and idempotent (spec §3/§8): the flag only
    /// ever goes true→false, and every caller after the first sees it
    /// already clear. Wakes every blocked taker so a `take()` on a newly
    /// deactivated, empty channel returns rather than blocking forever.
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.waiters.wake_all();
    }

    fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<T> UnboundedSender<T> {
    pub fn put(&self, value: T) -> Result<(), SendError<T>> {
        if !self.inner.active() || self.inner.receivers.load(Ordering::Acquire) == 0 {
            return Err(SendError(value));
        }
        self.inner.queue.lock().unwrap().push_back(value);
        self.inner.waiters.wake_one();
        Ok(())
    }

    /// Deactivates the channel: further `put`s fail, and a `take`/`try_take`
    /// on an empty channel returns without blocking instead of waiting for
    /// a producer that will never come.
    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn active(&self) -> bool {
        self.inner.active()
    }
}

impl<T> Clone for UnboundedSender<T> {
    fn clone(&self) -> Self {
        self.inner.senders.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Drop for UnboundedSender<T> {
    fn drop(&mut self) {
        if self.inner.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.waiters.wake_all();
        }
    }
}

impl<T> UnboundedReceiver<T> {
    pub fn take(&self) -> Result<T, RecvError> {
        loop {
            if let Some(value) = self.inner.queue.lock().unwrap().pop_front() {
                return Ok(value);
            }
            if !self.inner.active() || self.inner.senders.load(Ordering::Acquire) == 0 {
                return Err(RecvError::Disconnected);
            }
            self.inner.waiters.park();
        }
    }

    pub fn try_take(&self) -> Result<T, TryRecvError> {
        if let Some(value) = self.inner.queue.lock().unwrap().pop_front() {
            return Ok(value);
        }
        if !self.inner.active() || self.inner.senders.load(Ordering::Acquire) == 0 {
            Err(TryRecvError::Disconnected)
        } else {
            Err(TryRecvError::Empty)
        }
    }

    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn active(&self) -> bool {
        self.inner.active()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().unwrap().is_empty()
    }
}

impl<T> Drop for UnboundedReceiver<T> {
    fn drop(&mut self) {
        self.inner.receivers.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_take_in_order() {
        let (tx, rx) = unbounded();
        tx.put(1).unwrap();
        tx.put(2).unwrap();
        assert_eq!(rx.take().unwrap(), 1);
        assert_eq!(rx.take().unwrap(), 2);
    }

    #[test]
    fn take_after_senders_dropped_and_drained_is_disconnected() {
        let (tx, rx) = unbounded::<u32>();
        drop(tx);
        assert_eq!(rx.take().unwrap_err(), RecvError::Disconnected);
    }

    #[test]
    fn put_after_receiver_dropped_is_an_error() {
        let (tx, rx) = unbounded();
        drop(rx);
        assert!(tx.put(1).is_err());
    }

    #[test]
    fn deactivate_is_idempotent_and_unblocks_a_waiting_take() {
        let (tx, rx) = unbounded::<u32>();
        assert!(rx.active());
        tx.deactivate();
        tx.deactivate();
        assert!(!rx.active());
        assert!(matches!(tx.put(1), Err(_)));
        assert_eq!(rx.take().unwrap_err(), RecvError::Disconnected);
    }
}
