use crate::invariants::debug_assert_occupancy_sane;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// COUNTER ARBITRATION
// =============================================================================
//
// All lock-free variants share one claim protocol over two monotonically
// increasing 32-bit counters:
//
// - A producer owns the slot named by the `head` value it claimed, for one
//   lap of the ring; a consumer likewise owns the slot named by its claimed
//   `tail` value. Ownership lasts until the slot handshake publishes the
//   transfer, so the counters arbitrate *who* touches a slot and the slot
//   protocol arbitrates *when*.
//
// - Counters wrap; `head.wrapping_sub(tail) as i32` is the authoritative
//   signed occupancy. Capacities are capped at 2^30 so the signed reading
//   never aliases (see `MAX_CAPACITY`).
//
// - `try_push`/`try_pop` claim with a compare-exchange after an occupancy
//   check and thus keep `0 <= occupancy <= capacity`. The unconditional
//   `push`/`pop` claim with fetch-add *before* the slot is free, so the raw
//   counter difference may transiently exceed capacity (or go negative)
//   while claimants wait inside the slot handshake. The observers clamp
//   accordingly.
//
// - Claim ordering: Acquire on every read-modify-write, so the slot access
//   is ordered after the claim; SeqCst instead when the queue is configured
//   for total order. The slot handshake carries the producer->consumer
//   Release/Acquire edge.
//
// =============================================================================

/// Outcome marker for a consumer that gave up its claimed slot under the
/// optimist protocol.
pub(crate) struct Abandoned;

/// Per-slot storage strategy plugged into [`RingCore`].
///
/// Implementations map a claimed counter value to a slot (mask or modulo,
/// plus the cache-line permutation) and run the slot-level handshake.
pub(crate) trait Slots {
    type Item;

    fn capacity(&self) -> usize;

    /// Publish `value` into the slot named by `claimed`, spinning until the
    /// previous lap's consumer has drained it.
    ///
    /// `Err` hands the value back when the slot carries an abandonment
    /// marker; the caller must re-claim a fresh index and retry.
    ///
    /// # Safety
    ///
    /// `claimed` must be a head value obtained from this ring's claim
    /// protocol, claimed exactly once.
    unsafe fn store(&self, claimed: u32, value: Self::Item) -> Result<(), Self::Item>;

    /// Consume the slot named by `claimed`, spinning until the producer has
    /// published.
    ///
    /// With `allow_abandon` set, an optimist storage may give up after its
    /// bounded wait: it marks the slot and returns `Err(Abandoned)`. The
    /// claim is then spent and must not be retried. `allow_abandon` is only
    /// passed from `try_pop`, where the occupancy check proved a producer
    /// has claimed this index; a blocking `pop` on an empty queue must wait,
    /// not burn through indices.
    ///
    /// # Safety
    ///
    /// `claimed` must be a tail value obtained from this ring's claim
    /// protocol, claimed exactly once.
    unsafe fn load(&self, claimed: u32, allow_abandon: bool) -> Result<Self::Item, Abandoned>;
}

/// The common arbitration base: head/tail claim protocol generic over the
/// slot storage strategy. The public queue types are thin wrappers around
/// this plus a concrete [`Slots`] implementation.
pub(crate) struct RingCore<S: Slots> {
    head: CachePadded<AtomicU32>,
    tail: CachePadded<AtomicU32>,
    spsc: bool,
    total_order: bool,
    slots: S,
}

impl<S: Slots> RingCore<S> {
    pub(crate) const fn new(slots: S, spsc: bool, total_order: bool) -> Self {
        Self {
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            spsc,
            total_order,
            slots,
        }
    }

    #[inline]
    fn claim_order(&self) -> Ordering {
        if self.total_order {
            Ordering::SeqCst
        } else {
            Ordering::Acquire
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn try_push(&self, value: S::Item) -> Result<(), S::Item> {
        let mut value = value;
        loop {
            let mut head = self.head.load(Ordering::Acquire);
            loop {
                let occupied = head.wrapping_sub(self.tail.load(Ordering::Relaxed)) as i32;
                debug_assert_occupancy_sane!(occupied);
                if occupied >= self.slots.capacity() as i32 {
                    return Err(value);
                }
                if self.spsc {
                    self.head.store(head.wrapping_add(1), Ordering::Relaxed);
                    break;
                }
                match self.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    self.claim_order(),
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(current) => head = current,
                }
            }
            // SAFETY: `head` was claimed by exactly this thread just above.
            match unsafe { self.slots.store(head, value) } {
                Ok(()) => return Ok(()),
                // The consumer abandoned this slot; the storage has already
                // reset it, claim a fresh index for the value.
                Err(returned) => value = returned,
            }
        }
    }

    pub(crate) fn try_pop(&self) -> Option<S::Item> {
        let mut tail = self.tail.load(Ordering::Acquire);
        loop {
            let available = self.head.load(Ordering::Relaxed).wrapping_sub(tail) as i32;
            debug_assert_occupancy_sane!(available);
            if available <= 0 {
                return None;
            }
            if self.spsc {
                self.tail.store(tail.wrapping_add(1), Ordering::Relaxed);
                break;
            }
            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                self.claim_order(),
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => tail = current,
            }
        }
        // SAFETY: `tail` was claimed by exactly this thread just above.
        // An abandoned wait surfaces as a failed try_pop for this call.
        unsafe { self.slots.load(tail, true) }.ok()
    }

    pub(crate) fn push(&self, value: S::Item) {
        let mut value = value;
        loop {
            let head = if self.spsc {
                let head = self.head.load(Ordering::Relaxed);
                self.head.store(head.wrapping_add(1), Ordering::Relaxed);
                head
            } else {
                self.head.fetch_add(1, self.claim_order())
            };
            // SAFETY: `head` was claimed by exactly this thread just above.
            match unsafe { self.slots.store(head, value) } {
                Ok(()) => return,
                Err(returned) => value = returned,
            }
        }
    }

    pub(crate) fn pop(&self) -> S::Item {
        loop {
            let tail = if self.spsc {
                let tail = self.tail.load(Ordering::Relaxed);
                self.tail.store(tail.wrapping_add(1), Ordering::Relaxed);
                tail
            } else {
                self.tail.fetch_add(1, self.claim_order())
            };
            // SAFETY: `tail` was claimed by exactly this thread just above.
            if let Ok(value) = unsafe { self.slots.load(tail, false) } {
                return value;
            }
        }
    }

    /// Signed occupancy from one snapshot of both counters. May transiently
    /// exceed capacity (pending unconditional pushes) or go negative
    /// (pending unconditional pops).
    #[inline]
    fn snapshot(&self) -> i32 {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail) as i32
    }

    #[inline]
    pub(crate) fn was_empty(&self) -> bool {
        self.snapshot() <= 0
    }

    #[inline]
    pub(crate) fn was_full(&self) -> bool {
        self.snapshot() >= self.slots.capacity() as i32
    }

    #[inline]
    pub(crate) fn was_size(&self) -> usize {
        self.snapshot().max(0) as usize
    }

    pub(crate) fn slots_ref(&self) -> &S {
        &self.slots
    }

    /// Claim a head index without publishing, emulating a producer
    /// pre-empted between claim and slot handshake.
    #[cfg(test)]
    pub(crate) fn claim_head_unpublished(&self) -> u32 {
        self.head.fetch_add(1, self.claim_order())
    }

    /// Start both counters at an arbitrary value, for wrap-around tests.
    #[cfg(test)]
    pub(crate) fn preset_counters(&self, value: u32) {
        self.head.store(value, Ordering::SeqCst);
        self.tail.store(value, Ordering::SeqCst);
    }
}
