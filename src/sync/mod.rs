//! Fiber-aware synchronization primitives: blocking here suspends the
//! calling fiber rather than the OS thread it happens to be running on.

mod barrier;
mod condition;
mod count_down_event;
mod event;
mod mutex;
mod recursive_mutex;
pub mod spinlock;
pub(crate) mod waitlist;

pub use barrier::Barrier;
pub use condition::Condition;
pub use count_down_event::CountDownEvent;
pub use event::{AutoResetEvent, Event};
pub use mutex::{Mutex, MutexGuard};
pub use recursive_mutex::{RecursiveMutex, RecursiveMutexGuard};
pub use spinlock::{SpinGuard, SpinLock};
