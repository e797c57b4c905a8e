use thiserror::Error;

/// Largest accepted ring capacity.
///
/// The 32-bit head/tail counters arbitrate occupancy through a signed
/// difference, so the outstanding count must stay far below 2^31.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Construction errors. The hot paths never signal errors; a full or empty
/// queue is a normal `try_*` result, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Requested capacity was zero.
    #[error("ring capacity must be non-zero")]
    ZeroCapacity,
    /// Requested (or rounded) capacity exceeds what the 32-bit counter
    /// arbitration can represent.
    #[error("ring capacity {requested} exceeds the supported maximum")]
    CapacityOverflow {
        /// The capacity the caller asked for.
        requested: usize,
    },
    /// A compile-time-capacity ring was configured with a different runtime
    /// capacity.
    #[error("configured capacity {requested} does not match the fixed capacity {fixed}")]
    CapacityMismatch {
        /// The capacity the configuration carried.
        requested: usize,
        /// The ring's compile-time capacity.
        fixed: usize,
    },
}

/// Construction-time queue options.
///
/// Plain `Copy` struct with builder-style setters; the defaults favor
/// throughput under contention, matching the heap-allocated forms' intent.
///
/// ```
/// use ringmpmc_rs::RingConfig;
///
/// let config = RingConfig::new(1024).spsc(true).total_order(false);
/// assert_eq!(config.capacity, 1024);
/// assert!(config.spsc);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Requested number of slots. The heap forms may round this up, see
    /// `minimize_contention`.
    pub capacity: usize,
    /// Round the capacity up to a power of two and permute in-ring indices
    /// so that adjacent indices land on different cache lines. Disable to
    /// get the exact requested capacity at the cost of false sharing.
    pub minimize_contention: bool,
    /// Back off with speculative relaxed reloads inside the slot waits
    /// instead of hammering the read-modify-write.
    pub maximize_throughput: bool,
    /// Claim counters with sequentially consistent fetch-add so queue
    /// operations totally order with other seq-cst operations in the
    /// program. Off by default; acquire/release is enough for the queue's
    /// own guarantees.
    pub total_order: bool,
    /// Single-producer single-consumer fast path: counter claims become
    /// plain stores. Results are undefined if a second producer or consumer
    /// is ever attached.
    pub spsc: bool,
    /// Bounded-spin slot abandonment (sentinel heap form only): a consumer
    /// stuck behind a pre-empted producer marks its slot and re-claims,
    /// trading strict per-producer FIFO for liveness.
    pub optimist: bool,
}

impl RingConfig {
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            minimize_contention: true,
            maximize_throughput: true,
            total_order: false,
            spsc: false,
            optimist: false,
        }
    }

    pub const fn minimize_contention(mut self, enabled: bool) -> Self {
        self.minimize_contention = enabled;
        self
    }

    pub const fn maximize_throughput(mut self, enabled: bool) -> Self {
        self.maximize_throughput = enabled;
        self
    }

    pub const fn total_order(mut self, enabled: bool) -> Self {
        self.total_order = enabled;
        self
    }

    pub const fn spsc(mut self, enabled: bool) -> Self {
        self.spsc = enabled;
        self
    }

    pub const fn optimist(mut self, enabled: bool) -> Self {
        self.optimist = enabled;
        self
    }

    pub(crate) const fn validate(&self) -> Result<(), RingError> {
        if self.capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(RingError::CapacityOverflow {
                requested: self.capacity,
            });
        }
        Ok(())
    }
}
