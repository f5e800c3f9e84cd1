//! A deadline-aware park/wake pair, factored out of the built-in
//! [`super::Algorithm`] implementations so a `Scheduler`'s cross-thread
//! [`super::Handle`] can wake a parked worker without needing `Algorithm`
//! itself to be `Sync` (it holds non-`Sync` fiber state).

use std::sync::{Condvar, Mutex};
use std::time::Instant;

pub(crate) struct Parker {
    parked: Mutex<bool>,
    woken: Condvar,
}

impl Parker {
    pub(crate) fn new() -> Self {
        Self {
            parked: Mutex::new(false),
            woken: Condvar::new(),
        }
    }

    pub(crate) fn park(&self, deadline: Option<Instant>) {
        let mut parked = self.parked.lock().unwrap();
        *parked = true;
        while *parked {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    parked = self.woken.wait_timeout(parked, deadline - now).unwrap().0;
                }
                None => parked = self.woken.wait(parked).unwrap(),
            }
        }
        *parked = false;
    }

    pub(crate) fn wake(&self) {
        *self.parked.lock().unwrap() = false;
        self.woken.notify_all();
    }
}
