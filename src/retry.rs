use crate::{Backoff, Queue};

/// Converts a non-blocking queue into a blocking one by retrying the
/// `try_*` operations under graduated backoff.
///
/// The lock-free rings already provide blocking `push`/`pop` through the
/// unconditional counter claim; this wrapper is for callers that prefer the
/// retry-the-whole-operation shape, which never over-claims an index and so
/// keeps `was_size` within `0..=capacity`. No new state beyond the wrapped
/// queue.
///
/// ```
/// use ringmpmc_rs::{Queue, Retry, SentinelRing};
///
/// let q = Retry::new(SentinelRing::<u32>::new(256));
/// q.push(1);
/// assert_eq!(q.pop(), 1);
/// ```
pub struct Retry<Q> {
    inner: Q,
}

impl<Q> Retry<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<T, Q: Queue<T>> Queue<T> for Retry<Q> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.inner.try_push(value)
    }

    fn try_pop(&self) -> Option<T> {
        self.inner.try_pop()
    }

    fn push(&self, value: T) {
        let mut value = value;
        let mut backoff = Backoff::new();
        loop {
            match self.inner.try_push(value) {
                Ok(()) => return,
                Err(returned) => value = returned,
            }
            backoff.snooze();
        }
    }

    fn pop(&self) -> T {
        let mut backoff = Backoff::new();
        loop {
            if let Some(value) = self.inner.try_pop() {
                return value;
            }
            backoff.snooze();
        }
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn was_empty(&self) -> bool {
        self.inner.was_empty()
    }

    fn was_full(&self) -> bool {
        self.inner.was_full()
    }

    fn was_size(&self) -> usize {
        self.inner.was_size()
    }
}
