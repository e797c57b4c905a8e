//! Sentinel queue with compile-time capacity and inline storage.
//!
//! Same slot handshake as [`SentinelRing`](crate::SentinelRing), but the
//! atomic cells are embedded in the struct: no pointer indirection, no heap
//! allocation, and the index arithmetic constant-folds. The exact requested
//! capacity `N` is honored; the cache-line permutation switches on by itself
//! when `N` is a power of two large enough for it to be well-defined.
//!
//! Mind the size: the whole ring lives wherever you place the value. Put
//! large rings in a `Box` or a `static` rather than on a thread stack.

use crate::defs::spin_loop_pause;
use crate::index::{remap, shuffle_bits};
use crate::invariants::debug_assert_not_sentinel;
use crate::ring::{Abandoned, RingCore, Slots};
use crate::{AtomicItem, Queue, RingConfig, RingError};
use std::mem;
use std::sync::atomic::Ordering;

pub(crate) struct StackSentinelSlots<T: AtomicItem, const N: usize> {
    cells: [T::Atomic; N],
    nil: T,
    maximize_throughput: bool,
    spsc: bool,
}

impl<T: AtomicItem, const N: usize> StackSentinelSlots<T, N> {
    /// Permutation bits, decided by the capacity predicate at compile time.
    const SHUFFLE: u32 = shuffle_bits(N, mem::size_of::<T::Atomic>());

    fn new(nil: T, maximize_throughput: bool, spsc: bool) -> Self {
        Self {
            cells: std::array::from_fn(|_| T::atomic_new(nil)),
            nil,
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

impl<T: AtomicItem, const N: usize> Slots for StackSentinelSlots<T, N> {
    type Item = T;

    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    unsafe fn store(&self, claimed: u32, value: T) -> Result<(), T> {
        debug_assert_not_sentinel!(value, self.nil);
        let cell = &self.cells[Self::ring_index(claimed)];

        if self.spsc {
            while T::atomic_load(cell, Ordering::Relaxed) != self.nil {
                if self.maximize_throughput {
                    spin_loop_pause();
                }
            }
            T::atomic_store(cell, value, Ordering::Release);
            return Ok(());
        }

        loop {
            match T::atomic_compare_exchange_weak(
                cell,
                self.nil,
                value,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(_) => {
                    // Previous lap's consumer is still draining the slot.
                    spin_loop_pause();
                    while self.maximize_throughput
                        && T::atomic_load(cell, Ordering::Relaxed) != self.nil
                    {
                        spin_loop_pause();
                    }
                }
            }
        }
    }

    unsafe fn load(&self, claimed: u32, _allow_abandon: bool) -> Result<T, Abandoned> {
        let cell = &self.cells[Self::ring_index(claimed)];

        if self.spsc {
            loop {
                let value = T::atomic_load(cell, Ordering::Acquire);
                if value != self.nil {
                    T::atomic_store(cell, self.nil, Ordering::Relaxed);
                    return Ok(value);
                }
                if self.maximize_throughput {
                    spin_loop_pause();
                }
            }
        }

        loop {
            let value = T::atomic_swap(cell, self.nil, Ordering::Acquire);
            if value != self.nil {
                return Ok(value);
            }
            spin_loop_pause();
            while self.maximize_throughput && T::atomic_load(cell, Ordering::Relaxed) == self.nil {
                spin_loop_pause();
            }
        }
    }
}

/// Bounded lock-free MPMC sentinel queue with inline, compile-time-capacity
/// storage.
///
/// ```
/// use ringmpmc_rs::{Queue, StackSentinelRing};
///
/// let q: StackSentinelRing<u64, 16> = StackSentinelRing::new();
/// q.push(1);
/// q.push(2);
/// assert_eq!(q.pop(), 1);
/// assert_eq!(q.pop(), 2);
/// ```
pub struct StackSentinelRing<T: AtomicItem, const N: usize> {
    core: RingCore<StackSentinelSlots<T, N>>,
}

impl<T: AtomicItem, const N: usize> StackSentinelRing<T, N> {
    /// Creates a queue with the default sentinel (`ZERO`) and flags.
    pub fn new() -> Self {
        Self::with_sentinel(T::ZERO)
    }

    /// Creates a queue with a caller-chosen sentinel.
    pub fn with_sentinel(nil: T) -> Self {
        const { assert!(N > 0, "capacity must be non-zero") };
        const {
            assert!(
                N <= crate::MAX_CAPACITY,
                "capacity exceeds the counter arbitration range"
            )
        };
        let slots = StackSentinelSlots::new(nil, true, false);
        Self {
            core: RingCore::new(slots, false, false),
        }
    }

    /// Creates a queue honoring the configuration flags. The configured
    /// capacity must equal `N` (the compile-time capacity wins; a mismatch
    /// is a construction error). `minimize_contention` and `optimist` are
    /// decided by the type, not the configuration, and are ignored.
    pub fn with_config(nil: T, config: RingConfig) -> Result<Self, RingError> {
        const { assert!(N > 0, "capacity must be non-zero") };
        if config.capacity != N {
            return Err(RingError::CapacityMismatch {
                requested: config.capacity,
                fixed: N,
            });
        }
        let slots = StackSentinelSlots::new(nil, config.maximize_throughput, config.spsc);
        Ok(Self {
            core: RingCore::new(slots, config.spsc, config.total_order),
        })
    }
}

impl<T: AtomicItem, const N: usize> Default for StackSentinelRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AtomicItem, const N: usize> Queue<T> for StackSentinelRing<T, N> {
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
