//! The body of one pool worker thread: a `Scheduler<WorkStealing>` driven to
//! completion, registered with the pool's shared [`WorkStealingRegistry`] so
//! idle peers can steal from it and it can steal from them.

use std::thread;

use crate::scheduler::{Handle, Scheduler, WorkStealing, WorkStealingRegistry};

/// What a running worker thread exposes back to [`super::StaticPool`]: the
/// cross-thread handle used to dispatch submissions and request
/// interruption, and the `JoinHandle` used to wait for the thread to exit
/// during shutdown.
pub(super) struct Worker {
    pub(super) handle: Handle,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    /// Spawns the OS thread and blocks until its scheduler has installed
    /// itself and handed back a `Handle`, so the caller never observes a
    /// half-started worker.
    pub(super) fn spawn(
        index: usize,
        registry: std::sync::Arc<WorkStealingRegistry>,
        core: Option<core_affinity::CoreId>,
    ) -> Self {
        let (tx, rx) = std::sync::mpsc::sync_channel(0);
        let thread = thread::Builder::new()
            .name(format!("taskfiber-pool-worker-{index}"))
            .spawn(move || {
                if let Some(core) = core {
                    if let Err(err) = crate::numa::pin_current_thread(core) {
                        log::warn!("pool worker {index} failed to pin to {core:?}: {err}");
                    }
                }
                let algorithm = WorkStealing::new(registry);
                let scheduler = Scheduler::new(algorithm);
                let _ = tx.send(scheduler.handle());
                scheduler.run();
                log::debug!("pool worker {index} exiting");
            })
            .expect("failed to spawn pool worker thread");
        let handle = rx.recv().expect("worker thread dropped before reporting its handle");
        Self { handle, thread }
    }

    pub(super) fn join(self) {
        if let Err(payload) = self.thread.join() {
            log::warn!(
                "pool worker thread panicked: {}",
                payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("non-string panic payload")
            );
        }
    }
}
