//! A bounded channel with `high == low == 10`: a single producer puts 100
//! items, a single consumer drains them, the queue never grows past the
//! watermark, and order is preserved end to end.

mod support;

use pretty_assertions::assert_eq;
use taskfiber::channel::bounded_fifo;
use taskfiber::fiber::Builder;

#[test]
fn bounded_channel_enforces_its_watermark_and_preserves_order() {
    let (handle, join) = support::spawn_round_robin();

    const TOTAL: u32 = 100;
    const CAPACITY: usize = 10;

    let (tx, rx) = bounded_fifo::<u32>(CAPACITY).unwrap();

    let producer = Builder::new()
        .spawn_on(&handle, move || {
            for i in 0..TOTAL {
                tx.put(i).unwrap();
            }
        })
        .unwrap();

    let mut received = Vec::with_capacity(TOTAL as usize);
    let mut max_observed_len = 0;
    for _ in 0..TOTAL {
        max_observed_len = max_observed_len.max(rx.len());
        received.push(rx.take().unwrap());
    }

    producer.join().unwrap();

    assert!(
        max_observed_len <= CAPACITY,
        "queue length {max_observed_len} exceeded the high watermark of {CAPACITY}"
    );
    assert_eq!(received.len(), TOTAL as usize);
    assert_eq!(received, (0..TOTAL).collect::<Vec<_>>());

    support::shutdown(handle, join);
}
