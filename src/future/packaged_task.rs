//! Wraps a callable with a promise, so calling it populates the associated
//! future — the same pairing `std::packaged_task` provides in the original.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::future::promise::{Future, Promise};

/// A one-shot callable that reports its return value (or panic) through a
/// [`Future`]. Invoking it twice is a programming error.
pub struct PackagedTask<T> {
    func: Option<Box<dyn FnOnce() -> T + Send>>,
    promise: Option<Promise<T>>,
}

impl<T: Send + 'static> PackagedTask<T> {
    pub fn new<F>(func: F) -> (Self, Future<T>)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (promise, future) = Promise::new();
        (
            Self {
                func: Some(Box::new(func)),
                promise: Some(promise),
            },
            future,
        )
    }

    /// Runs the wrapped callable, satisfying the associated future.
    ///
    /// # Errors
    /// Returns `Err(Error::TaskAlreadyStarted)` if called more than once.
    pub fn invoke(&mut self) -> Result<()> {
        let func = self.func.take().ok_or(Error::TaskAlreadyStarted)?;
        let promise = self.promise.take().ok_or(Error::TaskAlreadyStarted)?;
        match panic::catch_unwind(AssertUnwindSafe(func)) {
            Ok(value) => promise.set_value(value),
            Err(payload) => promise.set_panic(payload),
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.func.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_satisfies_the_future() {
        let (mut task, future) = PackagedTask::new(|| 2 + 2);
        task.invoke().unwrap();
        assert_eq!(future.get().unwrap(), 4);
    }

    #[test]
    fn invoking_twice_is_rejected() {
        let (mut task, _future) = PackagedTask::new(|| ());
        task.invoke().unwrap();
        assert!(matches!(task.invoke(), Err(Error::TaskAlreadyStarted)));
    }
}
