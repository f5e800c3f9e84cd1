//! The rendezvous box shared between a `Promise` and its `Future`.

use std::any::Any;

use crate::error::{Error, Result};
use crate::sync::{Condition, Mutex};

pub(crate) enum Outcome<T> {
    Value(T),
    Panic(Box<dyn Any + Send + 'static>),
}

enum Slot<T> {
    Pending,
    Ready(Outcome<T>),
    Taken,
}

type Continuation = Box<dyn FnOnce() + Send>;

pub(crate) struct SharedState<T> {
    slot: Mutex<Slot<T>>,
    ready: Condition,
    continuation: Mutex<Option<Continuation>>,
    #[cfg(feature = "async")]
    waker: Mutex<Option<std::task::Waker>>,
}

impl<T> SharedState<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condition::new(),
            continuation: Mutex::new(None),
            #[cfg(feature = "async")]
            waker: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, outcome: Outcome<T>) -> Result<()> {
        let mut guard = self.slot.lock();
        match *guard {
            Slot::Pending => {
                *guard = Slot::Ready(outcome);
                drop(guard);
                self.ready.notify_all();
                #[cfg(feature = "async")]
                if let Some(waker) = self.waker.lock().take() {
                    waker.wake();
                }
                if let Some(cb) = self.continuation.lock().take() {
                    cb();
                }
                Ok(())
            }
            _ => Err(Error::PromiseAlreadySatisfied),
        }
    }

    /// Registers `cb` to run once this state becomes ready, used by
    /// [`super::Future::then`]. If the state is already ready, `cb` runs
    /// immediately on the calling thread; otherwise it runs on whichever
    /// thread later calls [`Self::set`] (the producer's side), matching
    /// `boost::fibers::future::then`'s "runs on the producer's scheduler"
    /// behavior.
    pub(crate) fn set_continuation(&self, cb: Continuation) {
        if matches!(*self.slot.lock(), Slot::Ready(_)) {
            cb();
            return;
        }
        *self.continuation.lock() = Some(cb);
        // `set` may have run between the check above and the store; if so
        // it already found `continuation` empty and won't call it, so take
        // over here.
        if matches!(*self.slot.lock(), Slot::Ready(_)) {
            if let Some(cb) = self.continuation.lock().take() {
                cb();
            }
        }
    }

    /// Registers `waker` to be woken the next time [`Self::set`] runs.
    /// Used only by the `async`-feature `futures::Future` adapter.
    #[cfg(feature = "async")]
    pub(crate) fn register_waker(&self, waker: &std::task::Waker) {
        *self.waker.lock() = Some(waker.clone());
    }

    /// True if a value/panic has been recorded but not yet consumed.
    pub(crate) fn is_ready(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Ready(_))
    }

    /// Blocks until an outcome is available, then takes it (subsequent
    /// calls return `Err(Error::FutureAlreadyRetrieved)`).
    pub(crate) fn take(&self) -> Result<Outcome<T>> {
        let mut guard = self.slot.lock();
        loop {
            match *guard {
                Slot::Ready(_) => break,
                Slot::Taken => return Err(Error::FutureAlreadyRetrieved),
                Slot::Pending => guard = self.ready.wait(guard),
            }
        }
        match std::mem::replace(&mut *guard, Slot::Taken) {
            Slot::Ready(outcome) => Ok(outcome),
            _ => unreachable!("checked above"),
        }
    }

    /// Peeks the ready value without consuming it, for [`super::SharedFuture`]
    /// holders that may call `get` more than once.
    pub(crate) fn peek_clone(&self) -> Result<T>
    where
        T: Clone,
    {
        let guard = self.slot.lock();
        match &*guard {
            Slot::Ready(Outcome::Value(v)) => Ok(v.clone()),
            Slot::Ready(Outcome::Panic(payload)) => {
                if let Some(err) = payload.downcast_ref::<Error>() {
                    Err(*err)
                } else {
                    Err(Error::BrokenPromise)
                }
            }
            Slot::Pending => Err(Error::FutureUninitialized),
            Slot::Taken => Err(Error::FutureAlreadyRetrieved),
        }
    }

    /// Marks the state broken (producer dropped without setting a value),
    /// if it wasn't already satisfied.
    pub(crate) fn abandon(&self) {
        let mut guard = self.slot.lock();
        if matches!(*guard, Slot::Pending) {
            *guard = Slot::Ready(Outcome::Panic(Box::new(Error::BrokenPromise)));
            drop(guard);
            self.ready.notify_all();
        }
    }
}

pub(crate) fn resolve<T>(outcome: Outcome<T>) -> Result<T> {
    match outcome {
        Outcome::Value(v) => Ok(v),
        Outcome::Panic(payload) => match payload.downcast::<Error>() {
            Ok(err) => Err(*err),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
