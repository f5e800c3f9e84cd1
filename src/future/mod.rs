//! Future/promise/packaged_task: a blocking rendezvous model closer to
//! `std::future` than Rust's `async` `Future` trait, since the source this
//! module is grounded on (`boost::fibers::{future,promise,packaged_task}`)
//! is itself blocking-on-`get()`. The `async` Cargo feature layers an
//! opt-in `futures::Future` adapter on top (see [`async_fn`]) without
//! changing this module's default behavior.

#[cfg(feature = "async")]
mod async_fn;
mod launch;
mod packaged_task;
mod promise;
mod shared_future;
mod shared_state;

pub use launch::{r#async, LaunchPolicy};
pub use packaged_task::PackagedTask;
pub use promise::{channel, Future, Promise};
pub use shared_future::SharedFuture;

/// Runs `f` as its own fiber on the current thread's scheduler, or inline
/// if no scheduler is active here. Used by [`Future::then`]'s continuation
/// and [`launch::async`]'s `as_sub_task`/`own_thread` fallback so a
/// continuation never runs nested inside the fiber that completed the
/// future it reacts to.
pub(crate) fn run_detached<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    if crate::scheduler::current().is_some() {
        let _ = crate::fiber::spawn(f);
    } else {
        f();
    }
}
