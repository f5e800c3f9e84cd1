//! A cyclic barrier: `count` participants must all call `wait()` before any
//! of them proceed, after which the barrier resets for another cycle.

use crate::sync::mutex::Mutex;
use crate::sync::waitlist::WaitList;

struct State {
    count: usize,
    waiting: usize,
    generation: u64,
}

pub struct Barrier {
    count: usize,
    state: Mutex<State>,
    waiters: WaitList,
}

impl Barrier {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "barrier count must be at least 1");
        Self {
            count,
            state: Mutex::new(State {
                count,
                waiting: 0,
                generation: 0,
            }),
            waiters: WaitList::new(),
        }
    }

    /// Blocks until `count` participants have called `wait()` for the
    /// current cycle. Returns `true` for exactly one of them per cycle — the
    /// "leader" that completed it, matching `boost::fibers::barrier::wait`.
    pub fn wait(&self) -> bool {
        let generation = {
            let mut state = self.state.lock();
            state.waiting += 1;
            if state.waiting == state.count {
                state.waiting = 0;
                state.generation += 1;
                drop(state);
                self.waiters.wake_all();
                return true;
            }
            state.generation
        };
        loop {
            if self.state.lock().generation != generation {
                return false;
            }
            self.waiters.park();
        }
    }

    pub fn participant_count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn exactly_one_participant_is_reported_as_leader() {
        let barrier = Arc::new(Barrier::new(3));
        let leaders: Vec<bool> = (0..3)
            .map(|_| {
                let b = barrier.clone();
                std::thread::spawn(move || b.wait())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        assert_eq!(leaders.iter().filter(|&&l| l).count(), 1);
    }
}
