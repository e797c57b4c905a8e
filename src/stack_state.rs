//! State-byte queue with compile-time capacity and inline storage.
//!
//! The [`StateRing`](crate::StateRing) handshake with both arrays embedded
//! in the struct. `new` is `const`, so a ring can live in a `static` and be
//! shared by reference without an `Arc`.

use crate::defs::spin_loop_pause;
use crate::index::{remap, shuffle_bits};
use crate::ring::{Abandoned, RingCore, Slots};
use crate::state::{EMPTY, LOADING, STORED, STORING};
use crate::{Queue, RingConfig, RingError};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, Ordering};

pub(crate) struct StackStateSlots<T, const N: usize> {
    states: [AtomicU8; N],
    cells: [UnsafeCell<MaybeUninit<T>>; N],
    maximize_throughput: bool,
    spsc: bool,
}

// Safety: identical discipline to the heap form; the state byte serializes
// all access to each cell.
unsafe impl<T: Send, const N: usize> Send for StackStateSlots<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for StackStateSlots<T, N> {}

impl<T, const N: usize> StackStateSlots<T, N> {
    /// Permutation bits over the one-byte state slots, decided at compile
    /// time by the capacity predicate.
    const SHUFFLE: u32 = shuffle_bits(N, 1);

    const fn new(maximize_throughput: bool, spsc: bool) -> Self {
        Self {
            states: [const { AtomicU8::new(EMPTY) }; N],
            // SAFETY: an array of MaybeUninit does not require
            // initialization.
            cells: unsafe { MaybeUninit::uninit().assume_init() },
            maximize_throughput,
            spsc,
        }
    }

    #[inline]
    fn ring_index(claimed: u32) -> usize {
        // For power-of-two N the compiler reduces this to a mask.
        remap((claimed as usize) % N, Self::SHUFFLE)
    }
}

impl<T, const N: usize> Slots for StackStateSlots<T, N> {
    type Item = T;

    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    unsafe fn store(&self, claimed: u32, value: T) -> Result<(), T> {
        let index = Self::ring_index(claimed);
        let state = &self.states[index];

        if self.spsc {
            while state.load(Ordering::Acquire) != EMPTY {
                if self.maximize_throughput {
                    spin_loop_pause();
                }
            }
            // SAFETY: the slot is EMPTY and we are the only producer.
            unsafe { (*self.cells[index].get()).write(value) };
            state.store(STORED, Ordering::Release);
            return Ok(());
        }

        loop {
            match state.compare_exchange_weak(
                EMPTY,
                STORING,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // SAFETY: we hold the slot in STORING.
                    unsafe { (*self.cells[index].get()).write(value) };
                    state.store(STORED, Ordering::Release);
                    return Ok(());
                }
                Err(_) => {
                    spin_loop_pause();
                    while self.maximize_throughput && state.load(Ordering::Relaxed) != EMPTY {
                        spin_loop_pause();
                    }
                }
            }
        }
    }

    unsafe fn load(&self, claimed: u32, _allow_abandon: bool) -> Result<T, Abandoned> {
        let index = Self::ring_index(claimed);
        let state = &self.states[index];

        if self.spsc {
            while state.load(Ordering::Acquire) != STORED {
                if self.maximize_throughput {
                    spin_loop_pause();
                }
            }
            // SAFETY: STORED was published with Release.
            let value = unsafe { (*self.cells[index].get()).assume_init_read() };
            state.store(EMPTY, Ordering::Release);
            return Ok(value);
        }

        loop {
            match state.compare_exchange_weak(
                STORED,
                LOADING,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // SAFETY: we hold the slot in LOADING.
                    let value = unsafe { (*self.cells[index].get()).assume_init_read() };
                    state.store(EMPTY, Ordering::Release);
                    return Ok(value);
                }
                Err(_) => {
                    spin_loop_pause();
                    while self.maximize_throughput && state.load(Ordering::Relaxed) != STORED {
                        spin_loop_pause();
                    }
                }
            }
        }
    }
}

impl<T, const N: usize> Drop for StackStateSlots<T, N> {
    fn drop(&mut self) {
        for (state, cell) in self.states.iter().zip(self.cells.iter_mut()) {
            if state.load(Ordering::Relaxed) == STORED {
                // SAFETY: STORED means the cell holds an initialized element
                // nobody consumed; we have exclusive access in drop.
                unsafe { cell.get_mut().assume_init_drop() };
            }
        }
    }
}

/// Bounded lock-free MPMC queue for arbitrary `Send` element types, with
/// inline compile-time-capacity storage.
///
/// ```
/// use ringmpmc_rs::{Queue, StackStateRing};
///
/// static Q: StackStateRing<u64, 64> = StackStateRing::new();
///
/// Q.push(10);
/// assert_eq!(Q.pop(), 10);
/// ```
pub struct StackStateRing<T, const N: usize> {
    core: RingCore<StackStateSlots<T, N>>,
}

impl<T: Send, const N: usize> StackStateRing<T, N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "capacity must be non-zero") };
        const {
            assert!(
                N <= crate::MAX_CAPACITY,
                "capacity exceeds the counter arbitration range"
            )
        };
        Self {
            core: RingCore::new(StackStateSlots::new(true, false), false, false),
        }
    }

    /// Creates a queue honoring the configuration flags. The configured
    /// capacity must equal `N`; `minimize_contention` and `optimist` are
    /// decided by the type and ignored.
    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        const { assert!(N > 0, "capacity must be non-zero") };
        if config.capacity != N {
            return Err(RingError::CapacityMismatch {
                requested: config.capacity,
                fixed: N,
            });
        }
        let slots = StackStateSlots::new(config.maximize_throughput, config.spsc);
        Ok(Self {
            core: RingCore::new(slots, config.spsc, config.total_order),
        })
    }
}

impl<T: Send, const N: usize> Default for StackStateRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send, const N: usize> Queue<T> for StackStateRing<T, N> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.core.try_push(value)
    }

    fn try_pop(&self) -> Option<T> {
        self.core.try_pop()
    }

    fn push(&self, value: T) {
        self.core.push(value);
    }

    fn pop(&self) -> T {
        self.core.pop()
    }

    fn capacity(&self) -> usize {
        self.core.capacity()
    }

    fn was_empty(&self) -> bool {
        self.core.was_empty()
    }

    fn was_full(&self) -> bool {
        self.core.was_full()
    }

    fn was_size(&self) -> usize {
        self.core.was_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_then_empty_cycle() {
        let q: StackStateRing<u32, 8> = StackStateRing::new();
        for i in 1..=8u32 {
            q.try_push(i).unwrap();
        }
        assert_eq!(q.try_push(9), Err(9));
        assert!(q.was_full());
        for i in 1..=8u32 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert_eq!(q.try_pop(), None);
        assert!(q.was_empty());
    }

    #[test]
    fn test_move_only_elements() {
        let q: StackStateRing<Box<i32>, 2> = StackStateRing::new();

        let p1 = Box::new(1);
        let p2 = Box::new(2);
        q.try_push(p1).unwrap();
        q.try_push(p2).unwrap();

        let q1 = q.try_pop().unwrap();
        let q2 = q.try_pop().unwrap();
        assert_eq!(*q1, 1);
        assert_eq!(*q2, 2);
    }

    #[test]
    fn test_static_queue() {
        static Q: StackStateRing<u64, 16> = StackStateRing::new();
        for i in 0..16u64 {
            Q.try_push(i).unwrap();
        }
        for i in 0..16u64 {
            assert_eq!(Q.try_pop(), Some(i));
        }
    }

    #[test]
    fn test_permutation_predicate() {
        assert_eq!(StackStateSlots::<u64, 4096>::SHUFFLE, 6);
        assert_eq!(StackStateSlots::<u64, 2048>::SHUFFLE, 0);
        assert_eq!(StackStateSlots::<u64, 8>::SHUFFLE, 0);
    }

    #[test]
    fn test_capacity_one_spsc_delivers_in_order() {
        let config = RingConfig::new(1).spsc(true);
        let q: StackStateRing<u8, 1> = StackStateRing::with_config(config).unwrap();
        for i in 0..10u8 {
            q.try_push(i).unwrap();
            assert_eq!(q.try_pop(), Some(i));
        }
    }
}
