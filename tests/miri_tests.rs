//! Miri-compatible tests for the unsafe paths.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! Small capacities and short loops keep the interpreter fast; the point is
//! to walk every unsafe access (cell writes under STORING, moves out under
//! LOADING, drop drains, mask/modulo indexing across laps), not to stress
//! concurrency.

use ringmpmc_rs::{MutexRing, Queue, RingConfig, SentinelRing, StackStateRing, StateRing};

#[test]
fn miri_sentinel_basic_laps() {
    let config = RingConfig::new(4).minimize_contention(false);
    let q: SentinelRing<u64> = SentinelRing::with_config(config).unwrap();

    for lap in 0..3u64 {
        for i in 1..=4u64 {
            q.try_push(lap * 10 + i).unwrap();
        }
        assert_eq!(q.try_push(99), Err(99));
        for i in 1..=4u64 {
            assert_eq!(q.try_pop(), Some(lap * 10 + i));
        }
        assert_eq!(q.try_pop(), None);
    }
}

#[test]
fn miri_sentinel_custom_sentinel() {
    let config = RingConfig::new(2).minimize_contention(false);
    let q = SentinelRing::with_sentinels(config, u32::MAX, u32::MAX - 1).unwrap();
    q.try_push(0).unwrap();
    assert_eq!(q.try_pop(), Some(0));
}

#[test]
fn miri_state_ring_move_only() {
    let config = RingConfig::new(2).minimize_contention(false);
    let q: StateRing<Box<u32>> = StateRing::with_config(config).unwrap();

    q.try_push(Box::new(1)).unwrap();
    q.try_push(Box::new(2)).unwrap();
    assert_eq!(*q.try_pop().unwrap(), 1);

    // Wrap within a lap while occupied.
    q.try_push(Box::new(3)).unwrap();
    assert_eq!(*q.try_pop().unwrap(), 2);
    assert_eq!(*q.try_pop().unwrap(), 3);
    assert!(q.try_pop().is_none());
}

#[test]
fn miri_state_ring_drop_drains() {
    let config = RingConfig::new(4).minimize_contention(false);
    let q: StateRing<String> = StateRing::with_config(config).unwrap();
    q.try_push(String::from("left")).unwrap();
    q.try_push(String::from("behind")).unwrap();
    // Dropped with two resident elements; miri verifies no leak.
}

#[test]
fn miri_stack_state_ring() {
    let q: StackStateRing<Vec<u8>, 2> = StackStateRing::new();
    q.try_push(vec![1, 2, 3]).unwrap();
    assert_eq!(q.try_pop(), Some(vec![1, 2, 3]));

    q.try_push(vec![4]).unwrap();
    q.try_push(vec![5]).unwrap();
    assert!(q.try_push(vec![6]).is_err());
    assert_eq!(q.try_pop(), Some(vec![4]));
    // One element left resident for the drop drain.
}

#[test]
fn miri_mutex_ring() {
    let config = RingConfig::new(3).minimize_contention(false);
    let q: MutexRing<String> = MutexRing::with_config(config).unwrap();
    for lap in 0..3 {
        q.try_push(format!("a{lap}")).unwrap();
        q.try_push(format!("b{lap}")).unwrap();
        assert_eq!(q.try_pop().unwrap(), format!("a{lap}"));
        assert_eq!(q.try_pop().unwrap(), format!("b{lap}"));
    }
    q.try_push(String::from("resident")).unwrap();
}
