//! The raw stack-switching primitive.
//!
//! Spec §1 calls the assembly-level context switch (`jump(from, to, arg)` /
//! `make(stack, fn)`) an external collaborator: "assumed available". We take
//! that literally and build on [`corosensei`], the same crate the reference
//! `k23` fiber implementation in this pack is "heavily based on" — it gives
//! us a safe, tested stack-switch primitive instead of hand-rolled asm.
//!
//! Boost.Fiber's `jump(from, to, arg)` is symmetric in name only: in
//! practice every context switch in the source runs through the scheduler's
//! trampoline (a fiber never jumps directly into another fiber; it always
//! jumps back to whichever context resumed it). `corosensei`'s
//! resume/suspend pair models exactly that shape, so [`FiberContext`] wraps
//! a `corosensei::Coroutine` instead of reimplementing symmetric jumps.
//!
//! [`Context`] is the pluggable seam DESIGN NOTES asks for: a different
//! backend (segmented stacks, a different arch) only has to implement this
//! trait.

use corosensei::stack::DefaultStack;
use corosensei::{Coroutine, CoroutineResult, Yielder};

use crate::error::Result;
use crate::stack::Stack;

/// What a fiber hands back to its scheduler when it suspends without
/// terminating: either a voluntary yield or a wait for some sync object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// Plain cooperative yield (`this_fiber::yield_now`).
    Yield,
    /// Blocked on a sync primitive; the primitive's waiter list owns the
    /// wakeup, the scheduler just stops scheduling this fiber until `ready`.
    Wait,
}

/// Resumption payload: always unit, but named so call sites read like the
/// spec's `jump(from, to, arg)`.
pub type Resume = ();

/// Outcome of resuming a fiber's context.
pub enum Transfer<R> {
    /// The fiber suspended itself; it can be resumed again later.
    Suspended(Suspend),
    /// The fiber's body ran to completion (or unwound from a panic), value
    /// `R` is the fiber body's return value.
    Completed(R),
}

/// A resumable, stack-switchable execution context.
///
/// Implemented here on top of `corosensei`; the trait exists so the
/// scheduler never talks to `corosensei` directly, satisfying DESIGN NOTES'
/// request for a pluggable `Context` seam.
pub trait Context {
    type Output;

    /// Resume this context. Returns `Transfer::Suspended` if the body
    /// yielded/waited, `Transfer::Completed` once the body function returns.
    ///
    /// # Panics
    /// Panics if called again after `Transfer::Completed` was already
    /// returned once.
    fn jump(&mut self) -> Transfer<Self::Output>;

    /// True once the context has started running (resumed at least once).
    fn started(&self) -> bool;

    /// True once the body has returned and the context can no longer be
    /// resumed.
    fn done(&self) -> bool;
}

type Body<R> = Coroutine<Resume, Suspend, R>;

/// The default [`Context`] implementation: a `corosensei` stackful
/// coroutine running on a heap-allocated guarded stack.
pub struct FiberContext<R> {
    coroutine: Body<R>,
}

impl<R: 'static> FiberContext<R> {
    /// Builds a context that will run `body` the first time it is resumed.
    ///
    /// `body` receives a [`Yielder`] it must use to suspend back to the
    /// scheduler (see [`suspend`]); it must not attempt to switch stacks any
    /// other way.
    pub fn new<F>(stack: Stack, body: F) -> Result<Self>
    where
        F: FnOnce(&Yielder<Resume, Suspend>, Resume) -> R + 'static,
    {
        let coroutine = Coroutine::with_stack(stack.into_inner(), body);
        Ok(Self { coroutine })
    }
}

impl<R> Context for FiberContext<R> {
    type Output = R;

    fn jump(&mut self) -> Transfer<R> {
        match self.coroutine.resume(()) {
            CoroutineResult::Yield(s) => Transfer::Suspended(s),
            CoroutineResult::Return(r) => Transfer::Completed(r),
        }
    }

    fn started(&self) -> bool {
        self.coroutine.started()
    }

    fn done(&self) -> bool {
        self.coroutine.done()
    }
}

/// Suspend the currently running fiber body, returning control to whichever
/// context resumed it. Called from inside the closure passed to
/// [`FiberContext::new`].
pub fn suspend(yielder: &Yielder<Resume, Suspend>, why: Suspend) {
    yielder.suspend(why);
}

/// Stack type used by [`FiberContext`] when no custom allocator is supplied.
pub type DefaultFiberStack = DefaultStack;
