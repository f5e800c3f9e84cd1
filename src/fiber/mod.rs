//! The fiber control block: identity, local storage, interruption state, and
//! the stack-switchable body itself.
//!
//! A `Fiber` is the unit the scheduler (`crate::scheduler`) moves in and out
//! of its ready queue. It owns a [`crate::context::FiberContext`] (the
//! switchable stack) and a boxed [`ControlBlock`] (identity + FSS +
//! interruption flags) whose address stays fixed for the fiber's whole
//! lifetime — the running body discovers its own [`Yielder`] exactly once,
//! on first entry, and stashes a pointer to it on the control block so that
//! `this_fiber::yield_now` can reach it from arbitrary call depth without
//! the scheduler needing to know anything about `corosensei`.

pub mod interrupt;
pub mod local;

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use corosensei::Yielder;

use crate::config::StackSize;
use crate::context::{self, FiberContext, Resume, Suspend, Transfer};
use crate::error::{Error, Result};
use crate::future::{self, Future as TaskFuture};
use crate::stack::{DefaultAllocator, Stack, StackAllocator};

/// Uniquely identifies a fiber for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fiber#{}", self.0)
    }
}

pub(crate) struct ControlBlock {
    id: FiberId,
    name: Option<Box<str>>,
    pub(crate) local: local::Storage,
    pub(crate) interrupt: interrupt::Interrupt,
    yielder: Cell<Option<*const Yielder<Resume, Suspend>>>,
}

impl ControlBlock {
    fn new(name: Option<String>) -> Self {
        Self {
            id: FiberId::next(),
            name: name.map(String::into_boxed_str),
            local: local::Storage::new(),
            interrupt: interrupt::Interrupt::new(),
            yielder: Cell::new(None),
        }
    }
}

/// A runnable fiber: a control block plus its switchable stack. Opaque to
/// everything except the scheduler, which is the only code that ever calls
/// [`Fiber::jump`].
pub struct Fiber {
    control: Box<ControlBlock>,
    context: FiberContext<()>,
}

impl Fiber {
    pub(crate) fn id(&self) -> FiberId {
        self.control.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.control.name.as_deref()
    }

    pub(crate) fn request_interrupt(&self) {
        self.control.interrupt.request();
    }

    /// Pointer used by the scheduler to populate `this_fiber`'s thread-local
    /// for the duration of a resume. Valid as long as `self` is not dropped.
    pub(crate) fn control_ptr(&self) -> *const ControlBlock {
        self.control.as_ref()
    }

    /// Resumes this fiber's context. Must only be called by the scheduler,
    /// with `this_fiber`'s thread-local already pointing at `control_ptr()`.
    pub(crate) fn jump(&mut self) -> Transfer<()> {
        self.context.jump()
    }

    fn spawn_with<F>(stack: Stack, name: Option<String>, body: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let control = Box::new(ControlBlock::new(name));
        let control_ptr: *const ControlBlock = control.as_ref();
        let context = FiberContext::new(stack, move |yielder, _resume: Resume| {
            // SAFETY: `control` (owned by the `Fiber` this closure's
            // `Coroutine` lives inside) outlives every invocation of this
            // body, and this line runs exactly once, before any suspend, so
            // the pointer is established before `yield_now` can ever be
            // called.
            unsafe {
                (*control_ptr).yielder.set(Some(yielder as *const _));
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                log::warn!("fiber panicked: {}", panic_message(&payload));
            }
        })?;
        Ok(Self { control, context })
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        self.control.local.cleanup();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Builds a fiber before spawning it, mirroring `std::thread::Builder`.
#[derive(Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<StackSize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: StackSize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Builds the fiber and hands it to the scheduler running on the
    /// current thread, returning a handle that can be joined for `f`'s
    /// return value.
    ///
    /// # Errors
    /// Returns `Err(Error::NoFiber)` if no scheduler is active on the
    /// calling thread (see `crate::scheduler::current`).
    pub fn spawn<F, T>(self, f: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (fiber, future) = self.build(f)?;
        let id = fiber.id();
        crate::scheduler::spawn_local(fiber)?;
        Ok(JoinHandle { id, future })
    }

    /// Like [`Self::spawn`], but hands the fiber to `handle`'s scheduler
    /// rather than whichever one (if any) is running on the calling thread.
    /// Used by `crate::pool::StaticPool` to dispatch a submission onto a
    /// specific worker from outside that worker's own thread.
    pub fn spawn_on<F, T>(self, handle: &crate::scheduler::Handle, f: F) -> Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (fiber, future) = self.build(f)?;
        let id = fiber.id();
        handle.spawn(fiber)?;
        Ok(JoinHandle { id, future })
    }

    fn build<F, T>(self, f: F) -> Result<(Fiber, TaskFuture<T>)>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let stack_size = self.stack_size.unwrap_or_default();
        let stack = DefaultAllocator
            .allocate(stack_size)
            .map_err(|_| Error::InvalidStackSize {
                requested: stack_size.bytes(),
                min: crate::config::MIN_STACK_SIZE,
                max: crate::config::MAX_STACK_SIZE,
            })?;
        let (promise, future) = future::channel::<T>();
        let fiber = Fiber::spawn_with(stack, self.name, move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            match outcome {
                Ok(value) => promise.set_value(value),
                Err(payload) => promise.set_panic(payload),
            }
        })?;
        Ok((fiber, future))
    }
}

/// A handle to a spawned fiber that yields its return value once the fiber
/// terminates.
pub struct JoinHandle<T> {
    id: FiberId,
    future: TaskFuture<T>,
}

impl<T: Send + 'static> JoinHandle<T> {
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Cooperatively blocks the calling fiber until the target fiber
    /// finishes, then returns its result (or propagates its panic, same as
    /// `std::thread::JoinHandle::join`).
    pub fn join(self) -> Result<T> {
        self.future.get()
    }

    /// Requests cooperative interruption of the target fiber; takes effect
    /// the next time it reaches an interruption point.
    pub fn interrupt(&self) {
        crate::scheduler::request_interrupt(self.id);
    }
}

/// Spawns a fiber on the current thread's scheduler with default settings.
pub fn spawn<F, T>(f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Builder::new().spawn(f)
}

/// Operations on the currently running fiber, mirroring `std::thread`'s
/// free functions.
pub mod this_fiber {
    use super::*;

    thread_local! {
        static CURRENT: Cell<Option<*const ControlBlock>> = Cell::new(None);
    }

    /// Installs `control` as the current fiber for the duration of `f`.
    /// Called by the scheduler immediately around [`Fiber::jump`].
    pub(crate) fn enter<R>(control: *const ControlBlock, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|c| c.replace(Some(control)));
        let result = f();
        CURRENT.with(|c| c.set(previous));
        result
    }

    pub(crate) fn with_control<R>(f: impl FnOnce(&ControlBlock) -> R) -> Option<R> {
        CURRENT.with(|c| c.get()).map(|ptr| {
            // SAFETY: set by `enter`, cleared before the fiber that owns it
            // could be dropped.
            f(unsafe { &*ptr })
        })
    }

    /// The identity of the fiber running on this thread, if any.
    pub fn current() -> Option<FiberId> {
        with_control(|c| c.id)
    }

    pub fn name() -> Option<String> {
        with_control(|c| c.name.as_deref().map(str::to_owned)).flatten()
    }

    /// Yields the remainder of the current fiber's time slice back to the
    /// scheduler, which may run other ready fibers before resuming this one.
    ///
    /// # Panics
    /// Panics if called outside a fiber.
    pub fn yield_now() {
        suspend(Suspend::Yield);
    }

    /// Suspends the current fiber until something wakes it (a sync
    /// primitive, a timer). Not normally called directly; sync primitives in
    /// `crate::sync` and `crate::channel` call this after registering the
    /// fiber as a waiter.
    pub fn wait() {
        suspend(Suspend::Wait);
    }

    fn suspend(why: Suspend) {
        let yielder = with_control(|c| c.yielder.get())
            .flatten()
            .expect("this_fiber operation called outside a fiber");
        // SAFETY: the pointer was captured from the live `Yielder` argument
        // to this fiber's own body closure; it remains valid for the whole
        // time the fiber exists, including after migrating between worker
        // threads, because it points at memory on the fiber's own stack.
        context::suspend(unsafe { &*yielder }, why);
    }

    /// Blocks the current fiber for at least `duration`, yielding the OS
    /// thread to other ready fibers in the meantime.
    pub fn sleep_for(duration: std::time::Duration) {
        sleep_until(std::time::Instant::now() + duration);
    }

    /// Blocks the current fiber until `deadline`, yielding the OS thread to
    /// other ready fibers in the meantime.
    pub fn sleep_until(deadline: std::time::Instant) {
        let id = current().expect("this_fiber::sleep_until called outside a fiber");
        crate::scheduler::sleep_until(id, deadline);
        wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiber_ids_are_unique_and_increasing() {
        let a = FiberId::next();
        let b = FiberId::next();
        assert!(b.0 > a.0);
    }

    #[test]
    fn this_fiber_current_is_none_outside_any_fiber() {
        assert!(this_fiber::current().is_none());
    }
}
