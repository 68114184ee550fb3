use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// Golden-ratio multiplier used to spread hash codes over a power-of-two table.
pub(crate) const FIBONACCI: u64 = 0x9E37_79B9_7F4A_7C15;

/// Content hash used by [`super::ContentEquality`].
pub fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Slot for `hash` in a table of `1 << (64 - shift)` entries.
#[inline]
pub(crate) fn fibonacci_place(hash: u64, shift: u32) -> usize {
    (hash.wrapping_mul(FIBONACCI) >> shift) as usize
}
