//! A pool of 4 workers runs 10 000 tasks, each computing `fib(10)`; every
//! task completes exactly once and the sum of results matches the expected
//! total.

use taskfiber::config::PoolConfig;
use taskfiber::pool::ShutdownMode;
use taskfiber::StaticPool;

fn fib(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fib(n - 1) + fib(n - 2),
    }
}

#[test]
fn ten_thousand_fib_tasks_are_each_run_exactly_once() {
    const TASK_COUNT: u64 = 10_000;

    let pool = StaticPool::new(PoolConfig::new(4).unwrap()).unwrap();

    let handles: Vec<_> = (0..TASK_COUNT).map(|_| pool.submit(|| fib(10)).unwrap()).collect();

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, TASK_COUNT * fib(10));

    pool.shutdown(ShutdownMode::Graceful);
}
