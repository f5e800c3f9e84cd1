//! Two fibers exchange six messages total over a pair of channels, then
//! both deactivate their own sending half and terminate.

mod support;

use pretty_assertions::assert_eq;
use taskfiber::channel::unbounded;
use taskfiber::fiber::Builder;

#[test]
fn two_fibers_exchange_six_messages_over_two_channels() {
    let (handle, join) = support::spawn_round_robin();

    let (to_b, from_a) = unbounded::<u32>();
    let (to_a, from_b) = unbounded::<u32>();

    let ping = Builder::new()
        .name("ping")
        .spawn_on(&handle, move || {
            let mut produced = 0u32;
            let mut consumed = 0u32;
            for i in 0..3 {
                to_b.put(i).unwrap();
                produced += 1;
                from_b.take().unwrap();
                consumed += 1;
            }
            to_b.deactivate();
            (produced, consumed)
        })
        .unwrap();

    let pong = Builder::new()
        .name("pong")
        .spawn_on(&handle, move || {
            let mut produced = 0u32;
            let mut consumed = 0u32;
            for _ in 0..3 {
                let value = from_a.take().unwrap();
                consumed += 1;
                to_a.put(value).unwrap();
                produced += 1;
            }
            to_a.deactivate();
            (produced, consumed)
        })
        .unwrap();

    let (producer1, consumer1) = ping.join().unwrap();
    let (producer2, consumer2) = pong.join().unwrap();

    assert_eq!((producer1, consumer1, producer2, consumer2), (3, 3, 3, 3));

    support::shutdown(handle, join);
}
