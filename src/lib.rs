//! Bounded lock-free MPMC ring queues.
//!
//! A family of fixed-capacity first-in first-out queues over a
//! pre-allocated circular buffer, built for passing small values between
//! threads with minimal per-operation latency. All variants share one
//! head/tail claim protocol; they differ in how a slot hands an element
//! from producer to consumer:
//!
//! - [`SentinelRing`] / [`StackSentinelRing`]: each slot is a single
//!   atomic; a reserved sentinel value marks it empty. Fastest handshake,
//!   restricted to scalar element types ([`AtomicItem`]).
//! - [`StateRing`] / [`StackStateRing`]: each slot pairs plain storage
//!   with an atomic state byte. Any `Send` element type, including
//!   move-only ones.
//! - [`MutexRing`]: the same contract under a single lock
//!   ([`SpinLock`] by default), kept as the correctness baseline.
//!
//! [`Retry`] turns the non-blocking `try_*` operations of any [`Queue`]
//! into blocking ones, and [`Barrier`] is the spinning rendezvous the
//! multi-threaded tests start from.
//!
//! The queues never sleep: blocking operations spin with the platform pause
//! hint. Capacity is fixed at construction; "full" and "empty" are ordinary
//! `try_*` outcomes, not errors.
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::{Queue, SentinelRing};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let q = Arc::new(SentinelRing::<u64>::new(1024));
//!
//! let producer = {
//!     let q = Arc::clone(&q);
//!     thread::spawn(move || {
//!         for i in 1..=1000u64 {
//!             q.push(i);
//!         }
//!     })
//! };
//!
//! let mut sum = 0u64;
//! for _ in 0..1000 {
//!     sum += q.pop();
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, 500_500);
//! ```

mod backoff;
mod barrier;
mod config;
mod defs;
mod index;
mod invariants;
mod mutex_ring;
mod queue;
mod retry;
mod ring;
mod sentinel;
mod stack_sentinel;
mod stack_state;
mod state;

pub use backoff::Backoff;
pub use barrier::Barrier;
pub use config::{RingConfig, RingError, MAX_CAPACITY};
pub use defs::{spin_loop_pause, CACHE_LINE_SIZE};
pub use index::{remap, round_up_to_power_of_2, shuffle_bits};
pub use mutex_ring::{MutexRing, RawLock, SpinLock};
pub use queue::Queue;
pub use retry::Retry;
pub use sentinel::{AtomicItem, SentinelRing};
pub use stack_sentinel::StackSentinelRing;
pub use stack_state::StackStateRing;
pub use state::StateRing;
