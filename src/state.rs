//! Heap-allocated state-byte queue for arbitrary element types.
//!
//! Each slot pairs plain element storage with an atomic state byte. The
//! byte sequences through `EMPTY -> STORING -> STORED -> LOADING -> EMPTY`
//! and never skips; the element access itself is a plain write/read fenced
//! by the byte's Release/Acquire edges. Nothing is required of the element
//! beyond `Send`, so move-only types (boxes, strings, handles) work.
//!
//! The cache-line permutation runs over the state array (one byte per
//! slot), which is where producers and consumers actually collide.

use crate::config::MAX_CAPACITY;
use crate::defs::{spin_loop_pause, CACHE_LINE_SIZE};
use crate::index::{remap, round_up_to_power_of_2, shuffle_bits};
use crate::ring::{Abandoned, RingCore, Slots};
use crate::{Queue, RingConfig, RingError};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, Ordering};

/// Slot states. `LOADING` is transient: the consumer holds it only between
/// winning the claim and releasing the slot back to `EMPTY`.
pub(crate) const EMPTY: u8 = 0;
pub(crate) const STORING: u8 = 1;
pub(crate) const STORED: u8 = 2;
pub(crate) const LOADING: u8 = 3;

pub(crate) struct StateSlots<T> {
    states: Box<[AtomicU8]>,
    cells: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// `capacity - 1` when the capacity is a power of two (mask indexing);
    /// unused otherwise (modulo indexing).
    mask: usize,
    pow2: bool,
    shuffle: u32,
    maximize_throughput: bool,
    spsc: bool,
}

// Safety: the state byte serializes all access to each cell. A cell is
// written only by the producer holding its claim in STORING, and read only
// by the consumer holding it in LOADING; the Release/Acquire pairs on the
// byte order those accesses.
unsafe impl<T: Send> Send for StateSlots<T> {}
unsafe impl<T: Send> Sync for StateSlots<T> {}

impl<T> StateSlots<T> {
    fn new(capacity: usize, shuffle: u32, config: &RingConfig) -> Self {
        let mut states = Vec::with_capacity(capacity);
        states.resize_with(capacity, || AtomicU8::new(EMPTY));
        let mut cells = Vec::with_capacity(capacity);
        cells.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));
        Self {
            states: states.into_boxed_slice(),
            cells: cells.into_boxed_slice(),
            mask: capacity.wrapping_sub(1),
            pow2: capacity.is_power_of_two(),
            shuffle,
            maximize_throughput: config.maximize_throughput,
            spsc: config.spsc,
        }
    }

    #[inline]
    fn ring_index(&self, claimed: u32) -> usize {
        let logical = if self.pow2 {
            (claimed as usize) & self.mask
        } else {
            (claimed as usize) % self.states.len()
        };
        remap(logical, self.shuffle)
    }
}

impl<T> Slots for StateSlots<T> {
    type Item = T;

    #[inline]
    fn capacity(&self) -> usize {
        self.states.len()
    }

    unsafe fn store(&self, claimed: u32, value: T) -> Result<(), T> {
        let index = self.ring_index(claimed);
        let state = &self.states[index];

        if self.spsc {
            // Acquire pairs with the consumer's Release of EMPTY, ordering
            // our element write after the previous lap's read.
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
                    // SAFETY: we hold the slot in STORING; no other thread
                    // touches the cell until we publish STORED.
                    unsafe { (*self.cells[index].get()).write(value) };
                    state.store(STORED, Ordering::Release);
                    return Ok(());
                }
                Err(_) => {
                    // Previous lap's consumer has not released the slot yet.
                    spin_loop_pause();
                    while self.maximize_throughput && state.load(Ordering::Relaxed) != EMPTY {
                        spin_loop_pause();
                    }
                }
            }
        }
    }

    unsafe fn load(&self, claimed: u32, _allow_abandon: bool) -> Result<T, Abandoned> {
        let index = self.ring_index(claimed);
        let state = &self.states[index];

        if self.spsc {
            while state.load(Ordering::Acquire) != STORED {
                if self.maximize_throughput {
                    spin_loop_pause();
                }
            }
            // SAFETY: STORED was published with Release; we are the only
            // consumer.
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
                    // SAFETY: we hold the slot in LOADING; the producer's
                    // Release of STORED makes the element visible.
                    let value = unsafe { (*self.cells[index].get()).assume_init_read() };
                    state.store(EMPTY, Ordering::Release);
                    return Ok(value);
                }
                Err(_) => {
                    // Our producer has not published yet.
                    spin_loop_pause();
                    while self.maximize_throughput && state.load(Ordering::Relaxed) != STORED {
                        spin_loop_pause();
                    }
                }
            }
        }
    }
}

impl<T> Drop for StateSlots<T> {
    fn drop(&mut self) {
        // Drain whatever was published but never consumed.
        for (state, cell) in self.states.iter().zip(self.cells.iter_mut()) {
            if state.load(Ordering::Relaxed) == STORED {
                // SAFETY: STORED means the cell holds an initialized element
                // nobody consumed; we have exclusive access in drop.
                unsafe { cell.get_mut().assume_init_drop() };
            }
        }
    }
}

/// Bounded lock-free MPMC queue for arbitrary `Send` element types.
///
/// Unlike [`SentinelRing`](crate::SentinelRing) there is no reserved value:
/// any element, including move-only types, round-trips unchanged.
///
/// With the default `minimize_contention` the capacity rounds up to a power
/// of two and to at least 4096 (the permutation floor for the one-byte state
/// slots); disable it for small exact capacities.
///
/// ```
/// use ringmpmc_rs::{Queue, RingConfig, StateRing};
///
/// let q: StateRing<Box<u32>> = StateRing::new(4096);
/// q.try_push(Box::new(1)).unwrap();
/// assert_eq!(*q.try_pop().unwrap(), 1);
/// ```
pub struct StateRing<T> {
    core: RingCore<StateSlots<T>>,
}

impl<T: Send> StateRing<T> {
    /// Creates a queue with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics on a zero or over-large capacity; use
    /// [`with_config`](Self::with_config) for a fallible constructor.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(RingConfig::new(capacity)).expect("invalid ring capacity")
    }

    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        config.validate()?;

        // The permutation geometry runs over the state bytes, not the
        // elements.
        let capacity = if config.minimize_contention {
            let floor = CACHE_LINE_SIZE * CACHE_LINE_SIZE;
            (round_up_to_power_of_2(config.capacity as u32) as usize).max(floor)
        } else {
            config.capacity
        };
        if capacity > MAX_CAPACITY {
            return Err(RingError::CapacityOverflow {
                requested: config.capacity,
            });
        }
        let shuffle = if config.minimize_contention {
            shuffle_bits(capacity, 1)
        } else {
            0
        };

        let slots = StateSlots::new(capacity, shuffle, &config);
        Ok(Self {
            core: RingCore::new(slots, config.spsc, config.total_order),
        })
    }
}

impl<T: Send> Queue<T> for StateRing<T> {
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
