//! A count-down event initialized to 3; three fibers each count it down,
//! and a single waiter is released exactly once, observing `current() == 0`.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskfiber::fiber::Builder;
use taskfiber::sync::CountDownEvent;

#[test]
fn waiter_is_released_once_after_three_count_downs() {
    let (handle, join) = support::spawn_round_robin();

    let latch = Arc::new(CountDownEvent::new(3));
    let released = Arc::new(AtomicUsize::new(0));

    let waiter = {
        let latch = latch.clone();
        let released = released.clone();
        Builder::new()
            .spawn_on(&handle, move || {
                latch.wait();
                released.fetch_add(1, Ordering::SeqCst);
                latch.current()
            })
            .unwrap()
    };

    let counters: Vec<_> = (0..3)
        .map(|_| {
            let latch = latch.clone();
            Builder::new().spawn_on(&handle, move || latch.count_down()).unwrap()
        })
        .collect();

    for c in counters {
        c.join().unwrap();
    }

    let observed_current = waiter.join().unwrap();

    assert_eq!(observed_current, 0);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(latch.initial(), 3);
    assert_eq!(latch.current(), 0);

    support::shutdown(handle, join);
}
