//! Variable-length integer helpers.
//!
//! Seven payload bits per byte, least significant group first, high bit set on
//! every byte but the last. A 32-bit value takes at most 5 bytes, a 64-bit value
//! at most 10.
//!
//! With `optimize_positive == false` the value is zigzag-mapped first so small
//! negative numbers stay short: `0 → 0, -1 → 1, 1 → 2, -2 → 3, ...`

/// Longest encoding of a 32-bit varint.
pub const MAX_VAR_INT_BYTES: usize = 5;

/// Longest encoding of a 64-bit varint.
pub const MAX_VAR_LONG_BYTES: usize = 10;

/// Maps a signed int so that small magnitudes become small unsigned values.
#[inline]
pub fn zigzag_encode_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode_i32`].
#[inline]
pub fn zigzag_decode_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Maps a signed long so that small magnitudes become small unsigned values.
#[inline]
pub fn zigzag_encode_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode_i64`].
#[inline]
pub fn zigzag_decode_i64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Raw bits that will be varint-encoded for `value`.
#[inline]
pub(crate) fn int_bits(value: i32, optimize_positive: bool) -> u32 {
    if optimize_positive {
        value as u32
    } else {
        zigzag_encode_i32(value)
    }
}

/// Raw bits that will be varint-encoded for `value`.
#[inline]
pub(crate) fn long_bits(value: i64, optimize_positive: bool) -> u64 {
    if optimize_positive {
        value as u64
    } else {
        zigzag_encode_i64(value)
    }
}

/// Number of bytes [`crate::io::Output::write_var_int`] uses for `value`.
pub fn var_int_length(value: i32, optimize_positive: bool) -> usize {
    let bits = int_bits(value, optimize_positive);
    match bits {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Number of bytes [`crate::io::Output::write_var_long`] uses for `value`.
pub fn var_long_length(value: i64, optimize_positive: bool) -> usize {
    let bits = long_bits(value, optimize_positive);
    if bits == 0 {
        return 1;
    }
    let significant = 64 - bits.leading_zeros() as usize;
    significant.div_ceil(7)
}
