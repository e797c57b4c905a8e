/// The contract shared by every queue in this crate.
///
/// All operations may be invoked concurrently from any number of threads
/// (except under the SPSC configuration, which restricts each side to one
/// thread). The `try_*` operations never block; `push` and `pop` spin until
/// the transfer completes and never sleep. Callers that cannot tolerate
/// spinning must stick to the `try_*` pair.
///
/// `try_push` hands the value back on failure instead of returning a flag,
/// so move-only element types survive a full queue.
pub trait Queue<T> {
    /// Non-blocking push. Returns the value back if the queue was full at
    /// the moment of observation. A full queue is a normal result, not an
    /// error.
    fn try_push(&self, value: T) -> Result<(), T>;

    /// Non-blocking pop. `None` if the queue was empty at the moment of
    /// observation.
    fn try_pop(&self) -> Option<T>;

    /// Push, spinning until a slot is available and the element is
    /// published. A producer whose partnered consumer never runs will spin
    /// forever; deadline enforcement is the caller's responsibility.
    fn push(&self, value: T);

    /// Pop, spinning until an element is available and consumed.
    fn pop(&self) -> T;

    /// Number of slots. Fixed at construction.
    fn capacity(&self) -> usize;

    /// Whether the queue looked empty in a single head/tail snapshot.
    ///
    /// Non-authoritative: a true result does not mean the next `try_pop`
    /// will fail, only that the queue was empty at some moment during the
    /// call.
    fn was_empty(&self) -> bool;

    /// Whether the queue looked full in a single head/tail snapshot. Same
    /// caveats as [`was_empty`](Queue::was_empty).
    fn was_full(&self) -> bool;

    /// How many elements a single head/tail snapshot showed. A hint only.
    fn was_size(&self) -> usize;
}
