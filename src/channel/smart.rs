//! A coalescing ("smart") channel keyed by `K`: sending again with a key
//! that already has an unconsumed value replaces it in place rather than
//! queuing a second message, so a slow consumer only ever sees the latest
//! value per key. Useful for things like periodic config/state updates
//! where only the newest snapshot matters.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{RecvError, TryRecvError};
use crate::sync::waitlist::WaitList;

struct Inner<K, T> {
    order: Mutex<VecDeque<K>>,
    pending: Mutex<HashMap<K, T>>,
    waiters: WaitList,
    senders: AtomicUsize,
    receivers: AtomicUsize,
    active: AtomicBool,
}

pub struct SmartSender<K, T> {
    inner: Arc<Inner<K, T>>,
}

pub struct SmartReceiver<K, T> {
    inner: Arc<Inner<K, T>>,
}

pub fn smart_channel<K: Eq + Hash + Clone, T>() -> (SmartSender<K, T>, SmartReceiver<K, T>) {
    let inner = Arc::new(Inner {
        order: Mutex::new(VecDeque::new()),
        pending: Mutex::new(HashMap::new()),
        waiters: WaitList::new(),
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
        active: AtomicBool::new(true),
    });
    (
        SmartSender {
            inner: inner.clone(),
        },
        SmartReceiver { inner },
    )
}

impl<K, T> Inner<K, T> {
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        self.waiters.wake_all();
    }

    fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<K: Eq + Hash + Clone, T> SmartSender<K, T> {
    /// Replaces any unconsumed value for `key`, or enqueues a fresh one.
    /// Never blocks and never fails on a full queue — there's no capacity
    /// limit, only at-most-one-pending-value-per-key. A no-op once the
    /// channel is deactivated.
    pub fn replace(&self, key: K, value: T) {
        if !self.inner.active() {
            return;
        }
        let mut pending = self.inner.pending.lock().unwrap();
        let is_new_key = pending.insert(key.clone(), value).is_none();
        drop(pending);
        if is_new_key {
            self.inner.order.lock().unwrap().push_back(key);
        }
        self.inner.waiters.wake_one();
    }

    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn active(&self) -> bool {
        self.inner.active()
    }
}

impl<K, T> Clone for SmartSender<K, T> {
    fn clone(&self) -> Self {
        self.inner.senders.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T> Drop for SmartSender<K, T> {
    fn drop(&mut self) {
        if self.inner.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.waiters.wake_all();
        }
    }
}

impl<K: Eq + Hash + Clone, T> SmartReceiver<K, T> {
    pub fn take(&self) -> Result<(K, T), RecvError> {
        loop {
            if let Some(item) = self.pop_oldest() {
                return Ok(item);
            }
            if !self.inner.active() || self.inner.senders.load(Ordering::Acquire) == 0 {
                return Err(RecvError::Disconnected);
            }
            self.inner.waiters.park();
        }
    }

    pub fn try_take(&self) -> Result<(K, T), TryRecvError> {
        if let Some(item) = self.pop_oldest() {
            return Ok(item);
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

    fn pop_oldest(&self) -> Option<(K, T)> {
        let key = self.inner.order.lock().unwrap().pop_front()?;
        let value = self
            .inner
            .pending
            .lock()
            .unwrap()
            .remove(&key)
            .expect("key in `order` always has a pending entry");
        Some((key, value))
    }
}

impl<K, T> Drop for SmartReceiver<K, T> {
    fn drop(&mut self) {
        self.inner.receivers.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivate_stops_further_replaces_and_unblocks_empty_take() {
        let (tx, rx) = smart_channel::<&str, u32>();
        tx.deactivate();
        tx.deactivate();
        tx.replace("ignored", 1);
        assert!(matches!(rx.try_take(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn replacing_a_pending_key_coalesces_to_the_latest_value() {
        let (tx, rx) = smart_channel();
        tx.replace("temp", 20);
        tx.replace("temp", 21);
        tx.replace("temp", 22);
        assert_eq!(rx.try_take().unwrap(), ("temp", 22));
        assert!(matches!(rx.try_take(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn distinct_keys_are_delivered_in_first_seen_order() {
        let (tx, rx) = smart_channel();
        tx.replace("a", 1);
        tx.replace("b", 2);
        assert_eq!(rx.try_take().unwrap(), ("a", 1));
        assert_eq!(rx.try_take().unwrap(), ("b", 2));
    }
}
