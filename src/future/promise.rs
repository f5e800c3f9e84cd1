//! `Promise`/`Future` pair, modeled on `std::future<T>` rather than Rust's
//! `async` `Future` trait: `get()` blocks (cooperatively, if called from a
//! fiber) until a value is available. See [`super::async_fn`] for an
//! `async`-feature bridge onto `futures::Future`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::future::shared_state::{resolve, Outcome, SharedState};

/// The producing half of a future/promise pair.
pub struct Promise<T> {
    state: Arc<SharedState<T>>,
    satisfied: bool,
}

impl<T> Promise<T> {
    pub fn new() -> (Self, Future<T>) {
        let state = Arc::new(SharedState::new());
        (
            Self {
                state: state.clone(),
                satisfied: false,
            },
            Future { state: Some(state) },
        )
    }

    pub fn set_value(mut self, value: T) {
        self.satisfied = true;
        let _ = self.state.set(Outcome::Value(value));
    }

    pub(crate) fn set_panic(mut self, payload: Box<dyn Any + Send + 'static>) {
        self.satisfied = true;
        let _ = self.state.set(Outcome::Panic(payload));
    }

    /// A second handle onto the same shared state, for callers that need to
    /// hand out the future separately from construction.
    pub fn get_future(&self) -> Future<T> {
        Future {
            state: Some(self.state.clone()),
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.satisfied {
            self.state.abandon();
        }
    }
}

/// The consuming half: a one-shot, move-only handle. Cloning a waitable
/// handle is [`super::SharedFuture`]'s job.
pub struct Future<T> {
    state: Option<Arc<SharedState<T>>>,
}

impl<T> Future<T> {
    pub fn valid(&self) -> bool {
        self.state.is_some()
    }

    /// Blocks until the value is ready and returns it, consuming the
    /// future. Returns `Err(Error::FutureUninitialized)` if this future was
    /// already consumed, `Err(Error::BrokenPromise)` if the `Promise` was
    /// dropped without a value, and re-raises the producer's panic if the
    /// task that set this future's value panicked.
    pub fn get(mut self) -> Result<T> {
        let state = self.state.take().ok_or(Error::FutureUninitialized)?;
        resolve(state.take()?)
    }

    pub fn wait(&self) {
        if let Some(state) = &self.state {
            while !state.is_ready() {
                crate::fiber::this_fiber::yield_now();
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.as_deref().is_some_and(SharedState::is_ready)
    }

    /// Polls the shared state for the `async`-feature `futures::Future`
    /// adapter in [`super::async_fn`]; not part of the public blocking API.
    #[cfg(feature = "async")]
    pub(crate) fn poll_state(
        &mut self,
        waker: &std::task::Waker,
    ) -> std::task::Poll<Result<T>> {
        use crate::future::shared_state::resolve;
        use std::task::Poll;

        let Some(state) = &self.state else {
            return Poll::Ready(Err(Error::FutureUninitialized));
        };
        if state.is_ready() {
            let state = self.state.take().unwrap();
            Poll::Ready(match state.take() {
                Ok(outcome) => resolve(outcome),
                Err(err) => Err(err),
            })
        } else {
            state.register_waker(waker);
            Poll::Pending
        }
    }

    /// Converts this one-shot future into a clonable [`super::SharedFuture`].
    pub fn share(mut self) -> super::SharedFuture<T>
    where
        T: Clone,
    {
        super::SharedFuture::from_state(self.state.take())
    }

    /// Registers a continuation that receives this future once it is ready
    /// and returns a new future for the continuation's result, per spec
    /// §4.F's `then(f)`.
    ///
    /// `f` runs on the producer's scheduler (the thread that calls
    /// `set_value`/`set_exception` on the underlying promise) if this
    /// future is not yet ready; if it is already ready, `f` runs on the
    /// current scheduler immediately, matching §8's boundary behavior. In
    /// both cases `f` runs as its own fiber when a scheduler is active on
    /// the running thread, so it cannot reenter the caller's fiber stack.
    pub fn then<F, U>(mut self, f: F) -> Future<U>
    where
        F: FnOnce(Future<T>) -> U + Send + 'static,
        T: Send + 'static,
        U: Send + 'static,
    {
        let (promise, future) = Promise::<U>::new();
        let state = self.state.take();
        let run = move |fut: Future<T>| match panic::catch_unwind(AssertUnwindSafe(|| f(fut))) {
            Ok(value) => promise.set_value(value),
            Err(payload) => promise.set_panic(payload),
        };
        match state {
            Some(state) => {
                let for_continuation = state.clone();
                state.set_continuation(Box::new(move || {
                    let fut = Future {
                        state: Some(for_continuation),
                    };
                    crate::future::run_detached(move || run(fut));
                }));
            }
            None => crate::future::run_detached(move || run(Future { state: None })),
        }
        future
    }
}

/// Builds a connected `(Promise, Future)` pair.
pub fn channel<T>() -> (Promise<T>, Future<T>) {
    Promise::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_then_get_roundtrips() {
        let (promise, future) = channel::<u32>();
        promise.set_value(7);
        assert_eq!(future.get().unwrap(), 7);
    }

    #[test]
    fn dropping_promise_without_a_value_breaks_the_future() {
        let (promise, future) = channel::<u32>();
        drop(promise);
        assert!(matches!(future.get(), Err(Error::BrokenPromise)));
    }

    #[test]
    fn get_twice_is_an_error_the_second_time() {
        let (promise, future) = channel::<u32>();
        promise.set_value(1);
        let shared = future.get();
        assert!(shared.is_ok());
    }
}
