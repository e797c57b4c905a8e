//! Heap-allocated sentinel (atomic-cell) queue.
//!
//! Each slot is a single atomic of the element type; one reserved value (the
//! sentinel, `NIL`) marks the slot empty. The element travels through the
//! atomic itself, so this variant is restricted to types with a native
//! lock-free atomic (see [`AtomicItem`]), but in exchange the whole slot
//! handshake is one compare-exchange against one cache line.

use crate::config::MAX_CAPACITY;
use crate::defs::{spin_loop_pause, CACHE_LINE_SIZE};
use crate::index::{remap, round_up_to_power_of_2, shuffle_bits};
use crate::invariants::debug_assert_not_sentinel;
use crate::ring::{Abandoned, RingCore, Slots};
use crate::{Backoff, Queue, RingConfig, RingError};
use std::mem;
use std::sync::atomic::{
    AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicU16, AtomicU32, AtomicU64,
    AtomicU8, AtomicUsize, Ordering,
};

/// Element types that fit a sentinel slot: trivially copyable scalars with a
/// native lock-free atomic of the same width.
///
/// Implemented for the integer primitives. The sentinel queues refuse (at
/// compile time) any element type without an implementation, which is this
/// crate's rendition of "construction fails when the platform lacks the
/// required lock-free atomic".
pub trait AtomicItem: Copy + Eq + Send + std::fmt::Debug {
    #[doc(hidden)]
    type Atomic: Send + Sync;

    /// The default sentinel.
    const ZERO: Self;
    /// The all-ones bit pattern (zero minus one in wrapping arithmetic);
    /// the default second sentinel of the optimist protocol.
    const ALL_ONES: Self;

    #[doc(hidden)]
    fn atomic_new(value: Self) -> Self::Atomic;
    #[doc(hidden)]
    fn atomic_load(cell: &Self::Atomic, order: Ordering) -> Self;
    #[doc(hidden)]
    fn atomic_store(cell: &Self::Atomic, value: Self, order: Ordering);
    #[doc(hidden)]
    fn atomic_swap(cell: &Self::Atomic, value: Self, order: Ordering) -> Self;
    #[doc(hidden)]
    fn atomic_compare_exchange_weak(
        cell: &Self::Atomic,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

macro_rules! impl_atomic_item {
    ($($elem:ty => $atomic:ty),* $(,)?) => {$(
        impl AtomicItem for $elem {
            type Atomic = $atomic;

            const ZERO: Self = 0;
            const ALL_ONES: Self = !0;

            #[inline]
            fn atomic_new(value: Self) -> Self::Atomic {
                <$atomic>::new(value)
            }

            #[inline]
            fn atomic_load(cell: &Self::Atomic, order: Ordering) -> Self {
                cell.load(order)
            }

            #[inline]
            fn atomic_store(cell: &Self::Atomic, value: Self, order: Ordering) {
                cell.store(value, order);
            }

            #[inline]
            fn atomic_swap(cell: &Self::Atomic, value: Self, order: Ordering) -> Self {
                cell.swap(value, order)
            }

            #[inline]
            fn atomic_compare_exchange_weak(
                cell: &Self::Atomic,
                current: Self,
                new: Self,
                success: Ordering,
                failure: Ordering,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current, new, success, failure)
            }
        }
    )*};
}

impl_atomic_item! {
    u8 => AtomicU8,
    u16 => AtomicU16,
    u32 => AtomicU32,
    u64 => AtomicU64,
    usize => AtomicUsize,
    i8 => AtomicI8,
    i16 => AtomicI16,
    i32 => AtomicI32,
    i64 => AtomicI64,
    isize => AtomicIsize,
}

// =============================================================================
// SLOT STORAGE
// =============================================================================

pub(crate) struct SentinelSlots<T: AtomicItem> {
    cells: Box<[T::Atomic]>,
    /// `capacity - 1` when the capacity is a power of two (mask indexing);
    /// unused otherwise (modulo indexing).
    mask: usize,
    pow2: bool,
    shuffle: u32,
    nil: T,
    nil2: T,
    maximize_throughput: bool,
    spsc: bool,
    optimist: bool,
}

impl<T: AtomicItem> SentinelSlots<T> {
    fn new(capacity: usize, shuffle: u32, nil: T, nil2: T, config: &RingConfig) -> Self {
        let mut cells = Vec::with_capacity(capacity);
        cells.resize_with(capacity, || T::atomic_new(nil));
        Self {
            cells: cells.into_boxed_slice(),
            mask: capacity.wrapping_sub(1),
            pow2: capacity.is_power_of_two(),
            shuffle,
            nil,
            nil2,
            maximize_throughput: config.maximize_throughput,
            spsc: config.spsc,
            optimist: config.optimist,
        }
    }

    #[inline]
    fn ring_index(&self, claimed: u32) -> usize {
        let logical = if self.pow2 {
            (claimed as usize) & self.mask
        } else {
            (claimed as usize) % self.cells.len()
        };
        remap(logical, self.shuffle)
    }

    pub(crate) fn nil(&self) -> T {
        self.nil
    }

    /// Consumer wait with the bounded-patience abandonment path.
    fn load_optimist(&self, cell: &T::Atomic) -> Result<T, Abandoned> {
        let mut backoff = Backoff::new();
        loop {
            let seen = T::atomic_load(cell, Ordering::Relaxed);
            if seen != self.nil && seen != self.nil2 {
                if T::atomic_compare_exchange_weak(
                    cell,
                    seen,
                    self.nil,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                )
                .is_ok()
                {
                    return Ok(seen);
                }
                continue;
            }
            if seen == self.nil && backoff.is_completed() {
                // The producer that claimed this index has not published
                // within our patience. Mark the slot so it can detect the
                // abandonment, and spend the claim.
                if T::atomic_compare_exchange_weak(
                    cell,
                    self.nil,
                    self.nil2,
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_ok()
                {
                    return Err(Abandoned);
                }
                continue;
            }
            // seen == nil2: an earlier abandonment is pending cleanup by its
            // producer; nothing for us to mark, keep waiting.
            backoff.snooze();
        }
    }
}

impl<T: AtomicItem> Slots for SentinelSlots<T> {
    type Item = T;

    #[inline]
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    unsafe fn store(&self, claimed: u32, value: T) -> Result<(), T> {
        debug_assert_not_sentinel!(value, self.nil);
        if self.optimist {
            debug_assert_not_sentinel!(value, self.nil2);
        }
        let cell = &self.cells[self.ring_index(claimed)];

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
                Err(seen) => {
                    if self.optimist && seen == self.nil2 {
                        // Our consumer gave up on this index. Hand the slot
                        // back for the next lap and make the caller re-claim.
                        if T::atomic_compare_exchange_weak(
                            cell,
                            self.nil2,
                            self.nil,
                            Ordering::Release,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                        {
                            return Err(value);
                        }
                        continue;
                    }
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

    unsafe fn load(&self, claimed: u32, allow_abandon: bool) -> Result<T, Abandoned> {
        let cell = &self.cells[self.ring_index(claimed)];

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

        if self.optimist && allow_abandon {
            return self.load_optimist(cell);
        }

        loop {
            let value = T::atomic_swap(cell, self.nil, Ordering::Acquire);
            if value != self.nil {
                return Ok(value);
            }
            // Our producer has not published yet.
            spin_loop_pause();
            while self.maximize_throughput && T::atomic_load(cell, Ordering::Relaxed) == self.nil {
                spin_loop_pause();
            }
        }
    }
}

// =============================================================================
// PUBLIC QUEUE
// =============================================================================

/// Bounded lock-free MPMC queue with heap-allocated sentinel slots.
///
/// The sentinel value (default: the zero bit pattern) is reserved to mean
/// "slot empty" and must never be pushed; debug builds assert on it.
///
/// With the default `minimize_contention` the requested capacity is rounded
/// up to a power of two and to at least (slots per cache line)², and in-ring
/// indices are permuted so neighbors do not share a cache line. Disable it
/// to get the exact requested capacity.
///
/// ```
/// use ringmpmc_rs::{Queue, SentinelRing};
///
/// let q: SentinelRing<u32> = SentinelRing::new(256);
/// assert!(q.try_push(7).is_ok());
/// assert_eq!(q.try_pop(), Some(7));
/// assert_eq!(q.try_pop(), None);
/// ```
pub struct SentinelRing<T: AtomicItem = u32> {
    core: RingCore<SentinelSlots<T>>,
}

impl<T: AtomicItem> SentinelRing<T> {
    /// Creates a queue with the default configuration and sentinel.
    ///
    /// # Panics
    ///
    /// Panics on a zero or over-large capacity; use
    /// [`with_config`](Self::with_config) for a fallible constructor.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(RingConfig::new(capacity)).expect("invalid ring capacity")
    }

    /// Creates a queue from a full configuration, with the default sentinels
    /// (`ZERO` empty marker, `ALL_ONES` abandonment marker).
    pub fn with_config(config: RingConfig) -> Result<Self, RingError> {
        Self::with_sentinels(config, T::ZERO, T::ALL_ONES)
    }

    /// Creates a queue with caller-chosen sentinels. `nil` must never appear
    /// as a pushed value; `nil2` additionally so under `optimist`.
    pub fn with_sentinels(config: RingConfig, nil: T, nil2: T) -> Result<Self, RingError> {
        config.validate()?;
        debug_assert!(!config.optimist || nil != nil2);

        let slot_size = mem::size_of::<T::Atomic>();
        let capacity = if config.minimize_contention {
            let per_line = CACHE_LINE_SIZE / slot_size;
            let floor = (per_line * per_line).max(1);
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
            shuffle_bits(capacity, slot_size)
        } else {
            0
        };

        let slots = SentinelSlots::new(capacity, shuffle, nil, nil2, &config);
        Ok(Self {
            core: RingCore::new(slots, config.spsc, config.total_order),
        })
    }

    /// The reserved empty-slot value.
    pub fn sentinel(&self) -> T {
        self.core.slots_ref().nil()
    }
}

impl<T: AtomicItem> Queue<T> for SentinelRing<T> {
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
    fn test_fifo_single_thread() {
        let q: SentinelRing<u64> = SentinelRing::new(64);
        for i in 1..=32u64 {
            q.try_push(i).unwrap();
        }
        for i in 1..=32u64 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_capacity_rounding() {
        // u32 slots: 16 per 64-byte line, so the floor is 256
        let q: SentinelRing<u32> = SentinelRing::new(10);
        assert_eq!(q.capacity(), 256);

        let q: SentinelRing<u32> = SentinelRing::new(1000);
        assert_eq!(q.capacity(), 1024);

        // u64 slots: 8 per line, floor 64
        let q: SentinelRing<u64> = SentinelRing::new(3);
        assert_eq!(q.capacity(), 64);
    }

    #[test]
    fn test_exact_capacity_when_contention_rounding_disabled() {
        let config = RingConfig::new(10).minimize_contention(false);
        let q: SentinelRing<u32> = SentinelRing::with_config(config).unwrap();
        assert_eq!(q.capacity(), 10);

        for i in 1..=10u32 {
            q.try_push(i).unwrap();
        }
        assert_eq!(q.try_push(11), Err(11));
        assert!(q.was_full());

        for i in 1..=10u32 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert_eq!(q.try_pop(), None);
        assert!(q.was_empty());
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            SentinelRing::<u32>::with_config(RingConfig::new(0)),
            Err(RingError::ZeroCapacity)
        ));
        assert!(matches!(
            SentinelRing::<u32>::with_config(RingConfig::new(MAX_CAPACITY * 2)),
            Err(RingError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn test_observers_snapshot() {
        let q: SentinelRing<u32> = SentinelRing::new(256);
        assert!(q.was_empty());
        assert!(!q.was_full());
        assert_eq!(q.was_size(), 0);

        q.try_push(1).unwrap();
        q.try_push(2).unwrap();
        assert!(!q.was_empty());
        assert_eq!(q.was_size(), 2);
    }

    #[test]
    fn test_custom_sentinel_round_trips_zero() {
        // With NIL = u32::MAX, zero becomes an ordinary payload.
        let config = RingConfig::new(64).minimize_contention(false);
        let q = SentinelRing::with_sentinels(config, u32::MAX, u32::MAX - 1).unwrap();
        assert_eq!(q.sentinel(), u32::MAX);

        q.try_push(0).unwrap();
        q.try_push(5).unwrap();
        assert_eq!(q.try_pop(), Some(0));
        assert_eq!(q.try_pop(), Some(5));
    }

    #[test]
    fn test_counter_wrap_conservation() {
        // Start both counters a few steps short of u32::MAX and run laps
        // across the wrap. Power-of-two capacity keeps mask indexing
        // continuous through the wrap.
        let config = RingConfig::new(16).minimize_contention(false);
        let q: SentinelRing<u64> = SentinelRing::with_config(config).unwrap();
        q.core.preset_counters(u32::MAX - 8);

        for i in 1..=64u64 {
            q.try_push(i).unwrap();
            assert_eq!(q.try_pop(), Some(i));
        }
        assert!(q.was_empty());

        // And with elements resident across the wrap.
        let q: SentinelRing<u64> = SentinelRing::with_config(config).unwrap();
        q.core.preset_counters(u32::MAX - 4);
        for i in 1..=8u64 {
            q.try_push(i).unwrap();
        }
        assert_eq!(q.was_size(), 8);
        for i in 1..=8u64 {
            assert_eq!(q.try_pop(), Some(i));
        }
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_spsc_mode_single_thread() {
        let config = RingConfig::new(8).minimize_contention(false).spsc(true);
        let q: SentinelRing<u32> = SentinelRing::with_config(config).unwrap();
        for lap in 0..4 {
            for i in 1..=8u32 {
                q.try_push(lap * 100 + i).unwrap();
            }
            assert_eq!(q.try_push(999), Err(999));
            for i in 1..=8u32 {
                assert_eq!(q.try_pop(), Some(lap * 100 + i));
            }
            assert_eq!(q.try_pop(), None);
        }
    }

    #[test]
    fn test_optimist_consumer_abandons_stalled_producer() {
        let config = RingConfig::new(16)
            .minimize_contention(false)
            .optimist(true);
        let q: SentinelRing<u32> = SentinelRing::with_config(config).unwrap();

        // A producer claims index 0 and stalls before publishing.
        let stalled_head = q.core.claim_head_unpublished();
        assert_eq!(stalled_head, 0);

        // A healthy producer publishes at index 1.
        q.try_push(7).unwrap();

        // The first pop targets the stalled index: it must complete within
        // the bounded wait, abandoning the slot instead of spinning forever.
        assert_eq!(q.try_pop(), None);

        // The next pop claims index 1 and finds the healthy value.
        assert_eq!(q.try_pop(), Some(7));

        // The stalled producer wakes up: its slot now carries the
        // abandonment marker, so the store reports it and hands the value
        // back for a fresh claim.
        let outcome = unsafe { q.core.slots_ref().store(stalled_head, 42) };
        assert_eq!(outcome, Err(42));

        // Conservation: re-pushing through the normal path delivers.
        q.try_push(42).unwrap();
        assert_eq!(q.try_pop(), Some(42));
        assert!(q.was_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "sentinel")]
    fn test_pushing_sentinel_is_a_contract_violation() {
        let q: SentinelRing<u32> = SentinelRing::new(64);
        let _ = q.try_push(0);
    }
}
