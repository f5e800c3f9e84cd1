//! A clonable, re-waitable future: many holders may call `get()`, each
//! getting their own clone of the value. Built by [`super::Future::share`].

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::future::shared_state::SharedState;

pub struct SharedFuture<T> {
    state: Option<Arc<SharedState<T>>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone> SharedFuture<T> {
    pub(crate) fn from_state(state: Option<Arc<SharedState<T>>>) -> Self {
        Self { state }
    }

    pub fn valid(&self) -> bool {
        self.state.is_some()
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

    /// Blocks until ready and returns a clone of the value. Unlike
    /// [`super::Future::get`], this does not consume the shared state — any
    /// other clone can still call `get` afterwards. Internally this peeks at
    /// the (still-`Ready`) slot rather than taking it, since multiple
    /// holders may call this.
    pub fn get(&self) -> Result<T> {
        let state = self.state.as_ref().ok_or(Error::FutureUninitialized)?;
        self.wait();
        state.peek_clone()
    }
}
