//! Runtime configuration: stack sizing, admission watermarks, pool sizing.
//!
//! Grounded in `tarantool::fiber::FiberAttr::set_stack_size`, which
//! validates the requested size and returns `Err(Error::Tarantool(..))`
//! rather than panicking; we follow the same "validate, don't panic" policy
//! throughout configuration.

use crate::error::{Error, Result};

/// Minimum stack size accepted for a fiber, chosen to comfortably fit a
/// `ucontext`/`corosensei` trampoline frame plus a modest call depth.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Default stack size for fibers created without an explicit size.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Largest stack size this crate will allocate for a single fiber.
pub const MAX_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Validates and carries a fiber stack size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackSize(usize);

impl StackSize {
    /// Validates `bytes` against [`MIN_STACK_SIZE`]/[`MAX_STACK_SIZE`].
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes < MIN_STACK_SIZE || bytes > MAX_STACK_SIZE {
            return Err(Error::InvalidStackSize {
                requested: bytes,
                min: MIN_STACK_SIZE,
                max: MAX_STACK_SIZE,
            });
        }
        Ok(Self(bytes))
    }

    pub fn bytes(self) -> usize {
        self.0
    }
}

impl Default for StackSize {
    fn default() -> Self {
        Self(DEFAULT_STACK_SIZE)
    }
}

/// Admission thresholds for a bounded channel or backpressure queue.
///
/// `high` blocks producers once reached; size dropping to `low` releases
/// blocked producers (one, unless `high == low`, in which case all are
/// released — see spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    high: usize,
    low: usize,
}

impl Watermarks {
    pub fn new(high: usize, low: usize) -> Result<Self> {
        if low > high {
            return Err(Error::InvalidWatermark { low, high });
        }
        Ok(Self { high, low })
    }

    /// Convenience constructor for `high == low == capacity`, the strict
    /// fixed-capacity case called out in spec §8 ("Boundary behaviors").
    pub fn fixed(capacity: usize) -> Self {
        Self {
            high: capacity,
            low: capacity,
        }
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn low(&self) -> usize {
        self.low
    }

    /// Releasing at the low watermark should wake every blocked producer
    /// rather than just one, exactly when high and low coincide (spec §4.E).
    pub fn release_all_at_low(&self) -> bool {
        self.high == self.low
    }
}

/// Configuration for a [`crate::pool::StaticPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub size: usize,
    pub watermarks: Option<Watermarks>,
    pub stack_size: StackSize,
    pub pin_to_cores: bool,
}

impl PoolConfig {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidPoolSize(size));
        }
        Ok(Self {
            size,
            watermarks: None,
            stack_size: StackSize::default(),
            pin_to_cores: false,
        })
    }

    /// One worker per available core, mirroring the original
    /// `static_pool::bind_to_processors()` constructor tag.
    pub fn bound_to_processors() -> Self {
        let size = crate::numa::available_cores().len().max(1);
        Self {
            size,
            watermarks: None,
            stack_size: StackSize::default(),
            pin_to_cores: true,
        }
    }

    pub fn with_watermarks(mut self, watermarks: Watermarks) -> Self {
        self.watermarks = Some(watermarks);
        self
    }

    pub fn with_stack_size(mut self, stack_size: StackSize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Pins each worker thread to its own core (cycling if `size` exceeds
    /// the core count). Has no effect on platforms `core_affinity` can't
    /// query topology for.
    pub fn with_core_affinity(mut self, enabled: bool) -> Self {
        self.pin_to_cores = enabled;
        self
    }
}
