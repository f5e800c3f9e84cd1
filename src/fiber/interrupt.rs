//! Cooperative interruption.
//!
//! Boost.Fiber raises interruption as a C++ exception thrown out of whatever
//! interruption point the fiber happens to be blocked in. Rust has no
//! equivalent to an arbitrary stack-unwinding exception type callers can
//! selectively catch, so per spec §9's redesign note we model it as an
//! explicit `Result`: [`interruption_point`] returns
//! `Err(Error::FiberInterrupted)` instead of unwinding.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::fiber::this_fiber;

#[derive(Debug, Default)]
pub(crate) struct Interrupt {
    requested: AtomicBool,
    enabled: AtomicBool,
}

impl Interrupt {
    pub(crate) fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        }
    }

    pub(crate) fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }
}

/// Checked at well-defined suspension points (mutex lock, condition wait,
/// channel take/put, `this_fiber::yield_now`). Returns
/// `Err(Error::FiberInterrupted)` if interruption was requested for the
/// calling fiber and is currently enabled, clearing the request so it only
/// fires once.
pub fn interruption_point() -> Result<()> {
    this_fiber::with_control(|control| {
        if control.interrupt.is_enabled() && control.interrupt.is_requested() {
            control.interrupt.requested.store(false, Ordering::Release);
            Err(Error::FiberInterrupted)
        } else {
            Ok(())
        }
    })
    .unwrap_or(Ok(()))
}

/// RAII guard that disables interruption delivery for the current fiber for
/// its lifetime, restoring the previous enabled state on drop. Mirrors
/// `boost::this_fiber::disable_interruption`.
#[must_use = "dropping this immediately re-enables interruption"]
pub struct DisableInterruption {
    previous: bool,
}

impl DisableInterruption {
    fn new() -> Self {
        let previous = this_fiber::with_control(|control| control.interrupt.set_enabled(false))
            .unwrap_or(true);
        Self { previous }
    }
}

impl Drop for DisableInterruption {
    fn drop(&mut self) {
        this_fiber::with_control(|control| control.interrupt.set_enabled(self.previous));
    }
}

/// Disables interruption for the current fiber until the returned guard is
/// dropped.
pub fn disable_interruption() -> DisableInterruption {
    DisableInterruption::new()
}

/// Explicitly restores interruption to enabled, independent of any
/// outstanding [`DisableInterruption`] guard. Mirrors
/// `boost::this_fiber::restore_interruption`.
pub fn restore_interruption(guard: DisableInterruption) {
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_interrupt_is_enabled_and_not_requested() {
        let i = Interrupt::new();
        assert!(i.is_enabled());
        assert!(!i.is_requested());
    }

    #[test]
    fn request_then_disable_suppresses_flag_state() {
        let i = Interrupt::new();
        i.request();
        assert!(i.is_requested());
        let was_enabled = i.set_enabled(false);
        assert!(was_enabled);
        assert!(!i.is_enabled());
    }
}
