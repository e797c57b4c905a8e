//! Platform primitives shared by every queue variant.

/// Cache line size the index permutation is computed against.
///
/// The head/tail counters themselves are padded with
/// [`crossbeam_utils::CachePadded`], which may pad to 128 bytes on x86_64 to
/// defeat the adjacent-line prefetcher; the *remap* geometry stays defined
/// over 64-byte lines.
pub const CACHE_LINE_SIZE: usize = 64;

/// Low-power busy-wait hint.
///
/// Lowers to `pause` on x86, `yield`/`isb` on ARM, and a compiler fence
/// elsewhere. Every spin loop in this crate goes through it.
#[inline(always)]
pub fn spin_loop_pause() {
    core::hint::spin_loop();
}
