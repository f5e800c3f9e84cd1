//! Fiber-specific storage (FSS): a `thread_local!`-shaped API keyed to the
//! currently running fiber instead of the OS thread.
//!
//! Since only one fiber runs on a given OS thread at a time, storage can
//! live directly on the fiber's own control block; `with` just has to find
//! the right slot. Cleanup runs the stored values' `Drop` impls when the
//! fiber terminates, same as `thread_local!` does at thread exit — including
//! the same hazard: a `Drop` impl that reaches back into FSS and inserts a
//! fresh slot. We bound the retry loop instead of looping forever.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CLEANUP_PASSES: u32 = 8;

#[derive(Default)]
pub(crate) struct Storage {
    slots: RefCell<HashMap<usize, Box<dyn Any>>>,
}

impl Storage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn get_or_init<T: 'static>(&self, key: usize, init: impl FnOnce() -> T) -> *const T {
        let mut slots = self.slots.borrow_mut();
        let entry = slots
            .entry(key)
            .or_insert_with(|| Box::new(init()) as Box<dyn Any>);
        entry.downcast_ref::<T>().expect("FSS key type mismatch") as *const T
    }

    /// Drops every stored value. Re-entrant inserts made by a value's own
    /// `Drop` impl are picked up and cleared on the next pass, up to
    /// [`MAX_CLEANUP_PASSES`]; anything left after that is logged and
    /// leaked rather than looped on forever.
    pub(crate) fn cleanup(&self) {
        for pass in 0..MAX_CLEANUP_PASSES {
            let drained: Vec<_> = self.slots.borrow_mut().drain().collect();
            if drained.is_empty() {
                return;
            }
            drop(drained);
            if pass == MAX_CLEANUP_PASSES - 1 {
                log::warn!(
                    "fiber-local storage cleanup did not converge after {} passes; \
                     a Drop impl is re-inserting FSS entries",
                    MAX_CLEANUP_PASSES
                );
            }
        }
    }
}

/// A fiber-local key, analogous to [`std::thread::LocalKey`] but scoped to
/// the currently running fiber. Construct with [`fiber_local!`].
pub struct FiberLocalKey<T: 'static> {
    init: fn() -> T,
}

impl<T: 'static> FiberLocalKey<T> {
    #[doc(hidden)]
    pub const fn new(init: fn() -> T) -> Self {
        Self { init }
    }

    /// Runs `f` with a reference to this fiber's slot, initializing it on
    /// first access.
    ///
    /// # Panics
    /// Panics if called from outside a fiber (see
    /// [`crate::error::Error::NoFiber`]).
    pub fn with<R>(&'static self, f: impl FnOnce(&T) -> R) -> R {
        let key = self as *const Self as usize;
        crate::fiber::this_fiber::with_control(|control| {
            let ptr = control.local.get_or_init(key, self.init);
            // SAFETY: `ptr` was produced by `get_or_init` from the map this
            // fiber owns; nothing else can mutate it for the duration of
            // this borrow because fibers are strictly single-threaded while
            // running, and `with` never re-enters across a suspension.
            f(unsafe { &*ptr })
        })
        .expect("fiber-local access requires an active fiber")
    }
}

/// Declares fiber-local storage, mirroring `std::thread_local!`.
///
/// ```ignore
/// fiber_local! {
///     static COUNTER: std::cell::Cell<u32> = std::cell::Cell::new(0);
/// }
/// COUNTER.with(|c| c.set(c.get() + 1));
/// ```
#[macro_export]
macro_rules! fiber_local {
    (static $name:ident: $ty:ty = $init:expr;) => {
        static $name: $crate::fiber::local::FiberLocalKey<$ty> =
            $crate::fiber::local::FiberLocalKey::new(|| $init);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_on_empty_storage_is_a_no_op() {
        let storage = Storage::new();
        storage.cleanup();
    }

    #[test]
    fn get_or_init_returns_stable_pointer_within_a_pass() {
        let storage = Storage::new();
        let a = storage.get_or_init(1, || 42u32);
        let b = storage.get_or_init(1, || 0u32);
        assert_eq!(a, b);
        unsafe {
            assert_eq!(*a, 42);
        }
    }
}
