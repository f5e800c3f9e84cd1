//! CPU pinning for pool worker threads.
//!
//! Mirrors the `BOOST_HAS_PROCESSOR_BINDINGS` path of the original
//! `static_pool` (`tag_bind_to_processors` / `bind_to_processors()`): rather
//! than a fixed worker count, the pool can be told to size itself to the
//! machine's cores and pin one worker per core. `tarantool`'s own fiber
//! runtime targets an embedded, single-process model with no concept of a
//! worker pool, so this module reaches for `core_affinity`, the crate
//! `num_cpus` itself recommends pairing with for exactly this purpose.

use crate::error::{Error, Result};

/// The cores available to pin worker threads to, queried once at pool
/// construction time.
pub fn available_cores() -> Vec<core_affinity::CoreId> {
    core_affinity::get_core_ids().unwrap_or_default()
}

/// Pins the calling thread to `core`. Intended to be called from inside a
/// freshly spawned pool worker thread, before it starts running its
/// scheduler.
///
/// # Errors
/// Returns `Err(Error::TaskRejected(..))` if the platform refused the
/// affinity request (`core_affinity` reports failure but not why).
pub fn pin_current_thread(core: core_affinity::CoreId) -> Result<()> {
    if core_affinity::set_for_current(core) {
        Ok(())
    } else {
        Err(Error::TaskRejected("failed to set thread core affinity"))
    }
}

/// Returns one core per worker, cycling through [`available_cores`] if the
/// pool is larger than the core count.
pub fn assign_cores(worker_count: usize) -> Vec<core_affinity::CoreId> {
    let cores = available_cores();
    if cores.is_empty() {
        return Vec::new();
    }
    (0..worker_count).map(|i| cores[i % cores.len()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_cores_cycles_when_pool_exceeds_core_count() {
        let cores = available_cores();
        if cores.is_empty() {
            return; // environment without queryable core topology
        }
        let assigned = assign_cores(cores.len() * 2 + 1);
        assert_eq!(assigned.len(), cores.len() * 2 + 1);
        assert_eq!(assigned[0], assigned[cores.len()]);
    }
}
