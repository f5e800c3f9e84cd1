//! Crate-wide error type.
//!
//! Operational statuses that are routine (timeout, rejection, would-block)
//! are modeled as small local enums next to the API that produces them (see
//! [`crate::channel`], [`crate::future`]) rather than folded in here — only
//! conditions that are fatal to the calling operation live in [`Error`].

/// A specialized [`Result`] type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the runtime.
///
/// Variants correspond to the error kinds enumerated by the fiber/task
/// surface: programming errors (moved handles, double-retrieval, unowned
/// unlock), configuration errors, and the few operations that must report
/// failure rather than block forever.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The current thread is not running inside a fiber, but the operation
    /// requires one (e.g. fiber-local storage access, `this_fiber::yield_now`).
    #[error("operation requires a fiber context, but none is active on this thread")]
    NoFiber,

    /// A fiber handle was used after the fiber it referred to was moved to a
    /// different scheduler (stolen) in a way incompatible with the
    /// operation, or the handle itself was already consumed.
    #[error("fiber was moved to another scheduler")]
    FiberMoved,

    /// The target fiber observed an interruption request at an interruption
    /// point.
    #[error("fiber was interrupted")]
    FiberInterrupted,

    /// A lock-related invariant was violated (e.g. unlocking a mutex from a
    /// fiber that does not own it).
    #[error("lock error: {0}")]
    Lock(&'static str),

    /// `Watermarks::new` was called with `low > high`.
    #[error("invalid watermark: low ({low}) must not exceed high ({high})")]
    InvalidWatermark { low: usize, high: usize },

    /// `PoolConfig` or `StaticPool::new` was given a pool size of zero.
    #[error("invalid pool size: {0} (must be >= 1)")]
    InvalidPoolSize(usize),

    /// A requested stack size fell outside the platform-supported range.
    #[error("invalid stack size: {requested} (allowed range is {min}..={max})")]
    InvalidStackSize {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// A task could not be admitted (pool shut down, or backpressure queue
    /// deactivated).
    #[error("task was rejected: {0}")]
    TaskRejected(&'static str),

    /// A `packaged_task` or task callable was invoked more than once.
    #[error("task was already started")]
    TaskAlreadyStarted,

    /// A task or its handle was used after being moved out.
    #[error("task handle was moved")]
    TaskMoved,

    /// The `promise` half of a shared state was dropped without a value ever
    /// being set.
    #[error("broken promise: producer was dropped before satisfying its future")]
    BrokenPromise,

    /// `set_value`/`set_exception` was called twice on the same `promise`.
    #[error("promise was already satisfied")]
    PromiseAlreadySatisfied,

    /// `get`/`wait` was called on a default-constructed or already-moved-from
    /// `future`.
    #[error("future has no associated shared state")]
    FutureUninitialized,

    /// `future::get` was called a second time.
    #[error("future's value was already retrieved")]
    FutureAlreadyRetrieved,

    /// An operation was attempted on a `pool` after it was shut down and its
    /// resources reclaimed.
    #[error("pool was already shut down")]
    PoolMoved,
}
