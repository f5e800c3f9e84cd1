//! A fiber parked on `Mutex::lock` on one scheduler must be woken by an
//! `unlock()` running on a *different* scheduler, on a different OS thread.
//! Every other sync primitive, channel, and future routes its blocking wait
//! through the same `WaitList`/`scheduler::wake` path this exercises, so this
//! is the one scenario that stands in for all of them.
//!
//! Runs the actual check on a background thread and waits on it with a
//! timeout: if cross-thread wakeups silently go to the wrong scheduler, the
//! waiter fiber parks forever and this test fails loudly instead of hanging
//! the whole suite.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use taskfiber::fiber::{this_fiber, Builder};
use taskfiber::sync::Mutex;

#[test]
fn mutex_unlock_wakes_a_waiter_parked_on_a_different_scheduler() {
    let (handle_a, join_a) = support::spawn_round_robin();
    let (handle_b, join_b) = support::spawn_round_robin();

    let mutex = Arc::new(Mutex::new(0u64));
    let holder_has_locked = Arc::new(AtomicBool::new(false));

    let holder_mutex = mutex.clone();
    let holder_flag = holder_has_locked.clone();
    let holder = Builder::new()
        .name("holder")
        .spawn_on(&handle_a, move || {
            let mut guard = holder_mutex.lock();
            holder_flag.store(true, Ordering::Release);
            // Give the waiter fiber on the other scheduler time to actually
            // park on the mutex before we release it, so this exercises the
            // blocked path instead of racing past an uncontended lock.
            this_fiber::sleep_for(Duration::from_millis(100));
            *guard += 1;
        })
        .unwrap();

    let waiter_mutex = mutex.clone();
    let waiter_flag = holder_has_locked.clone();
    let waiter = Builder::new()
        .name("waiter")
        .spawn_on(&handle_b, move || {
            while !waiter_flag.load(Ordering::Acquire) {
                this_fiber::yield_now();
            }
            *waiter_mutex.lock()
        })
        .unwrap();

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        holder.join().unwrap();
        let value = waiter.join().unwrap();
        let _ = tx.send(value);
    });

    let value = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("waiter on scheduler B was never woken by unlock() on scheduler A");
    assert_eq!(value, 1);

    support::shutdown(handle_a, join_a);
    support::shutdown(handle_b, join_b);
}
