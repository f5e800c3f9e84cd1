//! Shared scaffolding for the end-to-end scenario tests: each one needs a
//! scheduler running on its own thread, reachable from the test's own
//! thread through a `Handle`.

use std::thread;

use taskfiber::scheduler::{Handle, RoundRobin, Scheduler};

/// Spins up a `Scheduler<RoundRobin>` on its own thread and hands back a
/// `Handle` to inject fibers onto it from the calling (test) thread, plus
/// the spawned thread's own `JoinHandle` so the caller can wait for it to
/// exit after calling `Handle::shutdown`.
pub fn spawn_round_robin() -> (Handle, thread::JoinHandle<()>) {
    let scheduler = Scheduler::<RoundRobin>::new(RoundRobin::default());
    let handle = scheduler.handle();
    let join = thread::spawn(move || scheduler.run());
    (handle, join)
}

pub fn shutdown(handle: Handle, join: thread::JoinHandle<()>) {
    handle.shutdown();
    join.join().expect("scheduler thread panicked");
}
