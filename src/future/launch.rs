//! `async(fn, launch_policy)`, matching `boost::fibers::async`'s four launch
//! policies (spec §4.F). Named `r#async` since `async` is a reserved word.

use std::panic::{self, AssertUnwindSafe};

use crate::future::promise::{Future, Promise};
use crate::pool::StaticPool;

/// Where `r#async`'s callable should run.
pub enum LaunchPolicy<'a> {
    /// If called from a fiber already running on a scheduler, enqueue onto
    /// that scheduler (landing on the current worker's own deque if it's a
    /// pool worker); otherwise spawn a new OS thread. This is the default
    /// Boost.Fiber launch policy.
    AsSubTask,
    /// Always spawn a new OS thread, regardless of the calling context.
    NewThread,
    /// Run synchronously on the calling thread/fiber; `r#async` does not
    /// return until the callable has finished.
    OwnThread,
    /// Submit to a specific pool.
    StaticPool(&'a StaticPool),
}

/// Runs `f` per `policy` and returns a [`Future`] for its result.
///
/// Mirrors `boost::fibers::async(fn, launch_policy)`. A panic inside `f` is
/// captured and re-raised from the returned future's `get`, same as any
/// other task body in this crate.
pub fn r#async<F, T>(f: F, policy: LaunchPolicy<'_>) -> Future<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (promise, future) = Promise::new();
    let body = move || match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => promise.set_value(value),
        Err(payload) => promise.set_panic(payload),
    };
    match policy {
        LaunchPolicy::OwnThread => body(),
        LaunchPolicy::NewThread => {
            std::thread::spawn(body);
        }
        LaunchPolicy::AsSubTask => {
            if crate::scheduler::current().is_some() {
                let _ = crate::fiber::spawn(body);
            } else {
                std::thread::spawn(body);
            }
        }
        LaunchPolicy::StaticPool(pool) => {
            let _ = pool.submit(body);
        }
    }
    future
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_thread_runs_synchronously_and_is_ready_immediately() {
        let future = r#async(|| 2 + 2, LaunchPolicy::OwnThread);
        assert!(future.is_ready());
        assert_eq!(future.get().unwrap(), 4);
    }

    #[test]
    fn new_thread_eventually_resolves() {
        let future = r#async(|| 6 * 7, LaunchPolicy::NewThread);
        assert_eq!(future.get().unwrap(), 42);
    }

    #[test]
    fn as_sub_task_falls_back_to_a_thread_with_no_scheduler_active() {
        let future = r#async(|| "ok", LaunchPolicy::AsSubTask);
        assert_eq!(future.get().unwrap(), "ok");
    }

    #[test]
    fn static_pool_policy_submits_to_the_given_pool() {
        let pool = StaticPool::new(crate::config::PoolConfig::new(2).unwrap()).unwrap();
        let future = r#async(|| 10, LaunchPolicy::StaticPool(&pool));
        assert_eq!(future.get().unwrap(), 10);
        pool.shutdown(crate::pool::ShutdownMode::Graceful);
    }
}
