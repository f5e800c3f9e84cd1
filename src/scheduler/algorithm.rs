//! The pluggable scheduling policy seam.
//!
//! Named and shaped after `boost::fibers::algo::algorithm`: a scheduler
//! delegates every decision about *which* ready fiber to run next to one of
//! these, so swapping round-robin for work-stealing (or a custom priority
//! policy) never touches `crate::scheduler::Scheduler` itself.

use std::time::Instant;

use crate::fiber::Fiber;

pub trait Algorithm: Send {
    /// A fiber just became ready to run (freshly spawned, or woken from a
    /// wait) and is handed to the algorithm to place in its ready set.
    fn awakened(&mut self, fiber: Box<Fiber>);

    /// Removes and returns the next fiber to run, if any are ready.
    fn pick_next(&mut self) -> Option<Box<Fiber>>;

    /// Whether `pick_next` would return `Some` right now.
    fn has_ready_fibers(&self) -> bool;

    /// Called when the scheduler has nothing to run: park the OS thread
    /// until `deadline` (the next sleeping fiber's wakeup, if any) or until
    /// [`Algorithm::notify`] is called, whichever comes first.
    fn suspend_until(&mut self, deadline: Option<Instant>);

    /// Wakes a thread parked in [`Algorithm::suspend_until`]. Takes `&self`
    /// rather than `&mut self` because, unlike the other methods (always
    /// called from the scheduler's own thread), this one is called from
    /// whichever thread is waking the scheduler up — it must be safe to
    /// call concurrently with `suspend_until` running on the scheduler
    /// thread.
    fn notify(&self);
}
