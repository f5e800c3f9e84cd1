//! A priority channel: `take()` always returns the highest-priority pending
//! message, breaking ties in FIFO send order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use super::{RecvError, SendError, TryRecvError};
use crate::sync::waitlist::WaitList;

struct Item<T> {
    priority: u32,
    sequence: u64,
    value: T,
}

impl<T> PartialEq for Item<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl<T> Eq for Item<T> {}

impl<T> PartialOrd for Item<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Item<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; higher priority first, and among equal
        // priorities the earlier sequence number (smaller) should come out
        // first, hence the reversal on `sequence`.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Inner<T> {
    heap: Mutex<BinaryHeap<Item<T>>>,
    waiters: WaitList,
    next_sequence: AtomicU64,
    senders: AtomicUsize,
    receivers: AtomicUsize,
    active: AtomicBool,
}

pub struct PrioritySender<T> {
    inner: Arc<Inner<T>>,
}

pub struct PriorityReceiver<T> {
    inner: Arc<Inner<T>>,
}

pub fn priority_channel<T>() -> (PrioritySender<T>, PriorityReceiver<T>) {
    let inner = Arc::new(Inner {
        heap: Mutex::new(BinaryHeap::new()),
        waiters: WaitList::new(),
        next_sequence: AtomicU64::new(0),
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
        active: AtomicBool::new(true),
    });
    (
        PrioritySender {
            inner: inner.clone(),
        },
        PriorityReceiver { inner },
    )
}

impl<T> Inner<T> {
    fn deactivate(&self) {
        self.active.store(false, AtomicOrdering::Release);
        self.waiters.wake_all();
    }

    fn active(&self) -> bool {
        self.active.load(AtomicOrdering::Acquire)
    }
}

impl<T> PrioritySender<T> {
    pub fn put(&self, priority: u32, value: T) -> Result<(), SendError<T>> {
        if !self.inner.active() || self.inner.receivers.load(AtomicOrdering::Acquire) == 0 {
            return Err(SendError(value));
        }
        let sequence = self.inner.next_sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.inner.heap.lock().unwrap().push(Item {
            priority,
            sequence,
            value,
        });
        self.inner.waiters.wake_one();
        Ok(())
    }

    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn active(&self) -> bool {
        self.inner.active()
    }
}

impl<T> Clone for PrioritySender<T> {
    fn clone(&self) -> Self {
        self.inner.senders.fetch_add(1, AtomicOrdering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Drop for PrioritySender<T> {
    fn drop(&mut self) {
        if self.inner.senders.fetch_sub(1, AtomicOrdering::AcqRel) == 1 {
            self.inner.waiters.wake_all();
        }
    }
}

impl<T> PriorityReceiver<T> {
    pub fn take(&self) -> Result<T, RecvError> {
        loop {
            if let Some(item) = self.inner.heap.lock().unwrap().pop() {
                return Ok(item.value);
            }
            if !self.inner.active() || self.inner.senders.load(AtomicOrdering::Acquire) == 0 {
                return Err(RecvError::Disconnected);
            }
            self.inner.waiters.park();
        }
    }

    pub fn try_take(&self) -> Result<T, TryRecvError> {
        if let Some(item) = self.inner.heap.lock().unwrap().pop() {
            return Ok(item.value);
        }
        if !self.inner.active() || self.inner.senders.load(AtomicOrdering::Acquire) == 0 {
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
        self.inner.heap.lock().unwrap().is_empty()
    }
}

impl<T> Drop for PriorityReceiver<T> {
    fn drop(&mut self) {
        self.inner.receivers.fetch_sub(1, AtomicOrdering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_is_taken_first() {
        let (tx, rx) = priority_channel();
        tx.put(1, "low").unwrap();
        tx.put(5, "high").unwrap();
        tx.put(3, "mid").unwrap();
        assert_eq!(rx.take().unwrap(), "high");
        assert_eq!(rx.take().unwrap(), "mid");
        assert_eq!(rx.take().unwrap(), "low");
    }

    #[test]
    fn equal_priority_is_fifo() {
        let (tx, rx) = priority_channel();
        tx.put(1, "a").unwrap();
        tx.put(1, "b").unwrap();
        assert_eq!(rx.take().unwrap(), "a");
        assert_eq!(rx.take().unwrap(), "b");
    }
}
