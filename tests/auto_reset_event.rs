//! Four fibers wait on an auto-reset event; `set()` called four times
//! releases them one at a time, in the order they started waiting.
//!
//! The whole scenario runs inside one coordinator fiber so that every step
//! -- spawning the four waiters, letting them reach the event, and calling
//! `set()` once per waiter -- is ordered by cooperative scheduling on a
//! single thread rather than by wall-clock timing between OS threads.

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use taskfiber::channel::unbounded;
use taskfiber::fiber::{self, Builder};
use taskfiber::sync::AutoResetEvent;

#[test]
fn four_waiters_are_released_one_per_set_in_order() {
    let (handle, join) = support::spawn_round_robin();

    let coordinator = Builder::new()
        .spawn_on(&handle, || {
            let event = Arc::new(AutoResetEvent::new());
            let (released_tx, released_rx) = unbounded::<usize>();

            let (ready_tx, ready_rx) = unbounded::<usize>();

            let waiters: Vec<_> = (0..4)
                .map(|id| {
                    let event = event.clone();
                    let released_tx = released_tx.clone();
                    let ready_tx = ready_tx.clone();
                    fiber::spawn(move || {
                        // Announce registration right before blocking; a
                        // fiber runs uninterrupted from here straight into
                        // `event.wait()`'s park call, so once the
                        // coordinator observes this message the waiter is
                        // already on the event's wait list.
                        ready_tx.put(id).unwrap();
                        event.wait();
                        released_tx.put(id).unwrap();
                    })
                    .unwrap()
                })
                .collect();

            for _ in 0..4 {
                ready_rx.take().unwrap();
            }

            let mut release_order = Vec::with_capacity(4);
            let mut counter = 0;
            for _ in 0..4 {
                event.set();
                release_order.push(released_rx.take().unwrap());
                counter += 1;
            }

            for w in waiters {
                w.join().unwrap();
            }

            (counter, release_order)
        })
        .unwrap();

    let (counter, release_order) = coordinator.join().unwrap();

    assert_eq!(counter, 4);
    assert_eq!(release_order, vec![0, 1, 2, 3]);

    support::shutdown(handle, join);
}
