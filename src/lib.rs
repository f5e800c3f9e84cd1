//! A user-space cooperative concurrency runtime: stackful fibers
//! multiplexed onto a fixed set of OS threads by a pluggable scheduling
//! algorithm, plus the synchronization primitives, channels, futures, and
//! thread-pool executor built on top of them.
//!
//! Modeled on Boost.Fiber / Boost.Task's cooperative scheduling story,
//! expressed the way `tarantool-module` expresses its own fiber runtime:
//! `thiserror` for the crate-wide [`error::Error`], `log` at the same
//! decision points, and the same "validate, don't panic" posture in
//! [`config`].
//!
//! Start with [`fiber::spawn`] to run code cooperatively on the current
//! thread's [`scheduler::Scheduler`], or [`pool::StaticPool`] to spread
//! fibers across several OS threads with work-stealing between them.

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod fiber;
pub mod future;
pub mod numa;
pub mod pool;
pub mod scheduler;
pub mod semaphore;
pub mod stack;
pub mod sync;

pub use error::{Error, Result};
pub use fiber::{spawn, Builder as FiberBuilder, JoinHandle};
pub use pool::StaticPool;
pub use scheduler::{Algorithm, RoundRobin, Scheduler, WorkStealing};
