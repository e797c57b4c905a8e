//! Mutex-backed reference queue.
//!
//! Same external contract as the lock-free rings, implemented as a plain
//! ring under a user-supplied lock. Exists as the correctness baseline and
//! as the comparison point under contention; it offers no progress
//! guarantee beyond the lock's.

use crate::config::MAX_CAPACITY;
use crate::defs::spin_loop_pause;
use crate::index::{remap, round_up_to_power_of_2, shuffle_bits};
use crate::invariants::debug_assert_bounded_occupancy;
use crate::{Queue, RingConfig, RingError};
use std::cell::UnsafeCell;
use std::mem;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};

/// The lock seam: any object with acquire/release semantics works.
///
/// `lock` must establish an Acquire edge and `unlock` a Release edge, the
/// usual mutual-exclusion contract.
pub trait RawLock: Default + Send + Sync {
    fn lock(&self);
    fn unlock(&self);
}

/// Test-and-test-and-set spinlock with the pause hint, the default lock for
/// [`MutexRing`].
#[derive(Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl RawLock for SpinLock {
    fn lock(&self) {
        loop {
            if !self.locked.swap(true, Ordering::Acquire) {
                return;
            }
            while self.locked.load(Ordering::Relaxed) {
                spin_loop_pause();
            }
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

struct LockGuard<'a, L: RawLock>(&'a L);

impl<'a, L: RawLock> LockGuard<'a, L> {
    fn acquire(lock: &'a L) -> Self {
        lock.lock();
        Self(lock)
    }
}

impl<L: RawLock> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}

struct MutexInner<T> {
    head: u32,
    tail: u32,
    cells: Box<[MaybeUninit<T>]>,
}

/// Bounded MPMC FIFO queue under a single lock.
///
/// ```
/// use ringmpmc_rs::{MutexRing, Queue, SpinLock};
///
/// let q: MutexRing<u32, SpinLock> = MutexRing::new(64);
/// q.push(9);
/// assert_eq!(q.pop(), 9);
/// ```
pub struct MutexRing<T, L: RawLock = SpinLock> {
    lock: L,
    inner: UnsafeCell<MutexInner<T>>,
    shuffle: u32,
    pow2: bool,
}

// Safety: `inner` is only touched under `lock`.
unsafe impl<T: Send, L: RawLock> Send for MutexRing<T, L> {}
unsafe impl<T: Send, L: RawLock> Sync for MutexRing<T, L> {}

impl<T, L: RawLock> MutexRing<T, L> {
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

        let slot_size = mem::size_of::<T>().max(1);
        let capacity = if config.minimize_contention {
            round_up_to_power_of_2(config.capacity as u32) as usize
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

        let mut cells = Vec::with_capacity(capacity);
        cells.resize_with(capacity, MaybeUninit::uninit);
        Ok(Self {
            lock: L::default(),
            inner: UnsafeCell::new(MutexInner {
                head: 0,
                tail: 0,
                cells: cells.into_boxed_slice(),
            }),
            shuffle,
            pow2: capacity.is_power_of_two(),
        })
    }

    #[inline]
    fn ring_index(&self, counter: u32, capacity: usize) -> usize {
        let logical = if self.pow2 {
            (counter as usize) & (capacity - 1)
        } else {
            (counter as usize) % capacity
        };
        remap(logical, self.shuffle)
    }
}

impl<T: Send, L: RawLock> Queue<T> for MutexRing<T, L> {
    fn try_push(&self, value: T) -> Result<(), T> {
        let _guard = LockGuard::acquire(&self.lock);
        // SAFETY: the lock is held.
        let inner = unsafe { &mut *self.inner.get() };
        let capacity = inner.cells.len();
        let occupied = inner.head.wrapping_sub(inner.tail) as i32;
        debug_assert_bounded_occupancy!(occupied, capacity);
        if occupied >= capacity as i32 {
            return Err(value);
        }
        let index = self.ring_index(inner.head, capacity);
        inner.cells[index].write(value);
        inner.head = inner.head.wrapping_add(1);
        Ok(())
    }

    fn try_pop(&self) -> Option<T> {
        let _guard = LockGuard::acquire(&self.lock);
        // SAFETY: the lock is held.
        let inner = unsafe { &mut *self.inner.get() };
        let capacity = inner.cells.len();
        let occupied = inner.head.wrapping_sub(inner.tail) as i32;
        debug_assert_bounded_occupancy!(occupied, capacity);
        if occupied <= 0 {
            return None;
        }
        let index = self.ring_index(inner.tail, capacity);
        // SAFETY: the slot at `tail` was written by a push and not yet
        // consumed.
        let value = unsafe { inner.cells[index].assume_init_read() };
        inner.tail = inner.tail.wrapping_add(1);
        Some(value)
    }

    fn push(&self, value: T) {
        let mut value = value;
        loop {
            match self.try_push(value) {
                Ok(()) => return,
                Err(returned) => value = returned,
            }
            spin_loop_pause();
        }
    }

    fn pop(&self) -> T {
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            spin_loop_pause();
        }
    }

    fn capacity(&self) -> usize {
        let _guard = LockGuard::acquire(&self.lock);
        // SAFETY: the lock is held.
        unsafe { &*self.inner.get() }.cells.len()
    }

    fn was_empty(&self) -> bool {
        self.was_size() == 0
    }

    fn was_full(&self) -> bool {
        let _guard = LockGuard::acquire(&self.lock);
        // SAFETY: the lock is held.
        let inner = unsafe { &*self.inner.get() };
        inner.head.wrapping_sub(inner.tail) as i32 >= inner.cells.len() as i32
    }

    fn was_size(&self) -> usize {
        let _guard = LockGuard::acquire(&self.lock);
        // SAFETY: the lock is held.
        let inner = unsafe { &*self.inner.get() };
        (inner.head.wrapping_sub(inner.tail) as i32).max(0) as usize
    }
}

impl<T, L: RawLock> Drop for MutexRing<T, L> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        let capacity = inner.cells.len();
        let mut tail = inner.tail;
        while tail != inner.head {
            let logical = if self.pow2 {
                (tail as usize) & (capacity - 1)
            } else {
                (tail as usize) % capacity
            };
            let index = remap(logical, self.shuffle);
            // SAFETY: slots in [tail, head) hold initialized elements; we
            // have exclusive access in drop.
            unsafe { inner.cells[index].assume_init_drop() };
            tail = tail.wrapping_add(1);
        }
    }
}
