//! Debug assertion macros for the queue invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead on the release hot paths.

// =============================================================================
// Sentinel discipline
// =============================================================================

/// Assert that a value pushed into a sentinel queue is not a reserved value.
///
/// Pushing the sentinel would make the element indistinguishable from an
/// empty slot. Caller-side misuse, checked in debug builds only.
macro_rules! debug_assert_not_sentinel {
    ($value:expr, $nil:expr) => {
        debug_assert!(
            $value != $nil,
            "pushed a value equal to the reserved sentinel"
        )
    };
}

// =============================================================================
// Counter sanity
// =============================================================================

/// Assert that the signed head/tail difference stays far from the wrap
/// horizon of the 32-bit counters.
///
/// The occupancy comparison is only meaningful while the outstanding count
/// stays well below 2^31; this detects counter corruption, not normal wrap.
macro_rules! debug_assert_occupancy_sane {
    ($occupied:expr) => {
        debug_assert!(
            ($occupied as i32).unsigned_abs() < (1u32 << 30),
            "head/tail difference {} approaches the counter wrap horizon",
            $occupied
        )
    };
}

/// Assert that a lock-protected ring holds between zero and capacity
/// elements. Exact under the lock, unlike the lock-free observers.
macro_rules! debug_assert_bounded_occupancy {
    ($occupied:expr, $capacity:expr) => {
        debug_assert!(
            $occupied >= 0 && $occupied <= $capacity as i32,
            "occupancy {} outside 0..={}",
            $occupied,
            $capacity
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_not_sentinel;
pub(crate) use debug_assert_occupancy_sane;
