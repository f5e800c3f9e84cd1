//! A bounded channel with high/low watermark admission control: producers
//! block once the queue reaches `high`, and are released once it drains
//! back to `low` (all of them at once if `high == low`, matching
//! `Watermarks::release_all_at_low`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{RecvError, SendError, TryRecvError, TrySendError};
use crate::config::Watermarks;
use crate::error::Result as CrateResult;
use crate::sync::waitlist::WaitList;

struct Inner<T> {
    queue: Mutex<VecDeque<T>>,
    watermarks: Watermarks,
    send_waiters: WaitList,
    recv_waiters: WaitList,
    senders: AtomicUsize,
    receivers: AtomicUsize,
    active: AtomicBool,
}

pub struct BoundedSender<T> {
    inner: Arc<Inner<T>>,
}

pub struct BoundedReceiver<T> {
    inner: Arc<Inner<T>>,
}

pub fn bounded<T>(watermarks: Watermarks) -> (BoundedSender<T>, BoundedReceiver<T>) {
    let inner = Arc::new(Inner {
        queue: Mutex::new(VecDeque::new()),
        watermarks,
        send_waiters: WaitList::new(),
        recv_waiters: WaitList::new(),
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
        active: AtomicBool::new(true),
    });
    (
        BoundedSender {
            inner: inner.clone(),
        },
        BoundedReceiver { inner },
    )
}

impl<T> Inner<T> {
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.send_waiters.wake_all();
        self.recv_waiters.wake_all();
    }

    fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<T> BoundedSender<T> {
    /// Blocks the calling fiber once the queue is at the high watermark,
    /// woken as it drains back to the low watermark.
    pub fn put(&self, value: T) -> Result<(), SendError<T>> {
        let value = value;
        loop {
            if !self.inner.active() {
                return Err(SendError(value));
            }
            {
                let mut queue = self.inner.queue.lock().unwrap();
                if queue.len() < self.inner.watermarks.high() {
                    queue.push_back(value);
                    drop(queue);
                    self.inner.recv_waiters.wake_one();
                    return Ok(());
                }
            }
            if self.inner.receivers.load(Ordering::Acquire) == 0 {
                return Err(SendError(value));
            }
            self.inner.send_waiters.park();
        }
    }

    pub fn try_put(&self, value: T) -> Result<(), TrySendError<T>> {
        if !self.inner.active() || self.inner.receivers.load(Ordering::Acquire) == 0 {
            return Err(TrySendError::Disconnected(value));
        }
        let mut queue = self.inner.queue.lock().unwrap();
        if queue.len() < self.inner.watermarks.high() {
            queue.push_back(value);
            drop(queue);
            self.inner.recv_waiters.wake_one();
            Ok(())
        } else {
            Err(TrySendError::Full(value))
        }
    }

    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn active(&self) -> bool {
        self.inner.active()
    }
}

impl<T> Clone for BoundedSender<T> {
    fn clone(&self) -> Self {
        self.inner.senders.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Drop for BoundedSender<T> {
    fn drop(&mut self) {
        if self.inner.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.recv_waiters.wake_all();
        }
    }
}

impl<T> BoundedReceiver<T> {
    pub fn take(&self) -> Result<T, RecvError> {
        loop {
            if let Some(value) = self.pop_and_release() {
                return Ok(value);
            }
            if !self.inner.active() || self.inner.senders.load(Ordering::Acquire) == 0 {
                return Err(RecvError::Disconnected);
            }
            self.inner.recv_waiters.park();
        }
    }

    pub fn try_take(&self) -> Result<T, TryRecvError> {
        if let Some(value) = self.pop_and_release() {
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

    fn pop_and_release(&self) -> Option<T> {
        let mut queue = self.inner.queue.lock().unwrap();
        let value = queue.pop_front()?;
        let len = queue.len();
        drop(queue);
        if len <= self.inner.watermarks.low() {
            if self.inner.watermarks.release_all_at_low() {
                self.inner.send_waiters.wake_all();
            } else {
                self.inner.send_waiters.wake_one();
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for BoundedReceiver<T> {
    fn drop(&mut self) {
        if self.inner.receivers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.send_waiters.wake_all();
        }
    }
}

/// Convenience constructor for the `high == low == capacity` "fixed fifo"
/// case called out in spec §8's boundary behaviors.
pub fn bounded_fifo<T>(capacity: usize) -> CrateResult<(BoundedSender<T>, BoundedReceiver<T>)> {
    Ok(bounded(Watermarks::fixed(capacity)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_beyond_high_watermark_blocks_until_drained() {
        let (tx, rx) = bounded_fifo::<u32>(1).unwrap();
        tx.try_put(1).unwrap();
        assert!(matches!(tx.try_put(2), Err(TrySendError::Full(2))));
        assert_eq!(rx.take().unwrap(), 1);
        tx.try_put(2).unwrap();
    }

    #[test]
    fn deactivate_rejects_put_and_unblocks_empty_take() {
        let (tx, rx) = bounded_fifo::<u32>(4).unwrap();
        tx.deactivate();
        tx.deactivate();
        assert!(!tx.active());
        assert!(matches!(tx.try_put(1), Err(TrySendError::Disconnected(1))));
        assert!(matches!(rx.try_take(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn fixed_watermarks_release_all_waiters_together() {
        let watermarks = Watermarks::fixed(2);
        assert!(watermarks.release_all_at_low());
    }
}
