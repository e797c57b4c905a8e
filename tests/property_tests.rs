//! Property-based tests over the queue contract.
//!
//! Single-threaded sequences are enough to pin down the functional laws
//! (conservation, per-pair FIFO, capacity bounds, bit-exact round trips);
//! the interleaving-sensitive properties live in `stress_tests.rs` and the
//! loom suite.

use proptest::prelude::*;
use ringmpmc_rs::{Queue, RingConfig, SentinelRing, StackStateRing, StateRing};
use std::collections::VecDeque;

proptest! {
    /// Against a queue with one producer and one consumer, the queue is
    /// exactly a bounded FIFO: every try_push/try_pop outcome and every
    /// popped value matches the model.
    #[test]
    fn prop_matches_fifo_model(
        ops in prop::collection::vec(prop::option::of(1u64..u64::MAX), 1..200),
    ) {
        const CAP: usize = 8;
        let config = RingConfig::new(CAP).minimize_contention(false);
        let queue: SentinelRing<u64> = SentinelRing::with_config(config).unwrap();
        let mut model: VecDeque<u64> = VecDeque::new();

        for op in ops {
            match op {
                Some(value) => {
                    let pushed = queue.try_push(value).is_ok();
                    prop_assert_eq!(pushed, model.len() < CAP,
                        "push accepted/rejected against a model holding {}", model.len());
                    if pushed {
                        model.push_back(value);
                    }
                }
                None => {
                    let popped = queue.try_pop();
                    prop_assert_eq!(popped, model.pop_front());
                }
            }
            prop_assert_eq!(queue.was_size(), model.len());
            prop_assert_eq!(queue.was_empty(), model.is_empty());
            prop_assert_eq!(queue.was_full(), model.len() == CAP);
        }

        // Drain and compare the tail end.
        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(queue.try_pop(), Some(expected));
        }
        prop_assert_eq!(queue.try_pop(), None);
    }

    /// Arbitrary bit patterns round-trip unchanged through the state-byte
    /// variant (which reserves no values at all).
    #[test]
    fn prop_bit_patterns_round_trip(values in prop::collection::vec(any::<u64>(), 1..64)) {
        let config = RingConfig::new(64).minimize_contention(false);
        let queue: StateRing<u64> = StateRing::with_config(config).unwrap();

        for &v in &values {
            queue.try_push(v).unwrap();
        }
        for &v in &values {
            prop_assert_eq!(queue.try_pop(), Some(v));
        }
    }

    /// The number of unmatched pushes never exceeds the capacity.
    #[test]
    fn prop_occupancy_bounded(
        ops in prop::collection::vec(any::<bool>(), 1..300),
    ) {
        let queue: StackStateRing<u32, 16> = StackStateRing::new();
        let mut expected_len = 0usize;

        for push in ops {
            if push {
                if queue.try_push(1).is_ok() {
                    expected_len += 1;
                }
            } else if queue.try_pop().is_some() {
                expected_len -= 1;
            }
            prop_assert!(queue.was_size() <= queue.capacity());
            prop_assert_eq!(queue.was_size(), expected_len);
        }
    }

    /// Heap capacity rounding law: power of two, at least the request, at
    /// least the permutation floor for the slot width.
    #[test]
    fn prop_capacity_rounding(requested in 1usize..100_000) {
        let queue: SentinelRing<u32> = SentinelRing::new(requested);
        let capacity = queue.capacity();
        prop_assert!(capacity.is_power_of_two());
        prop_assert!(capacity >= requested);
        prop_assert!(capacity >= 256); // 16 u32 slots per line, squared

        let queue: StateRing<u32> = StateRing::new(requested);
        let capacity = queue.capacity();
        prop_assert!(capacity.is_power_of_two());
        prop_assert!(capacity >= requested);
        prop_assert!(capacity >= 4096); // 64 state bytes per line, squared
    }

    /// Exact-capacity mode honors the request verbatim.
    #[test]
    fn prop_exact_capacity(requested in 1usize..512) {
        let config = RingConfig::new(requested).minimize_contention(false);
        let queue: SentinelRing<u64> = SentinelRing::with_config(config).unwrap();
        prop_assert_eq!(queue.capacity(), requested);

        for i in 0..requested {
            prop_assert!(queue.try_push(i as u64 + 1).is_ok());
        }
        prop_assert!(queue.try_push(u64::MAX - 1).is_err());
    }
}
