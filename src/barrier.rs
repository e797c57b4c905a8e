use crate::defs::spin_loop_pause;
use std::sync::atomic::{AtomicU32, Ordering};

/// Spinning rendezvous barrier.
///
/// Participants call [`wait`](Barrier::wait) and spin; a coordinator calls
/// [`release`](Barrier::release) with the expected participant count to let
/// exactly that many through at once. The multi-threaded tests use it to
/// start all producers and consumers on the same instant instead of
/// measuring thread spawn skew.
///
/// Unlike [`std::sync::Barrier`] this one never sleeps, and the coordinator
/// is a distinct role rather than the last arriving thread.
pub struct Barrier {
    counter: AtomicU32,
}

impl Barrier {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }

    /// Announce arrival and spin until released.
    pub fn wait(&self) {
        self.counter.fetch_add(1, Ordering::Acquire);
        while self.counter.load(Ordering::Relaxed) != 0 {
            spin_loop_pause();
        }
    }

    /// Spin until `expected` participants have arrived, then release them
    /// all. Callable again for the next rendezvous round.
    pub fn release(&self, expected: u32) {
        while self.counter.load(Ordering::Relaxed) != expected {
            spin_loop_pause();
        }
        self.counter.store(0, Ordering::Release);
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}
