//! Binary primitives: buffered writers and readers over byte arrays or streams.
//!
//! [`Output`] grows its backing array on demand (up to an optional maximum) or, when
//! it wraps an [`std::io::Write`] sink, flushes its window instead. [`Input`] reads
//! from an owned byte array or refills its window from an [`std::io::Read`] source.
//!
//! These types know nothing about object types or references. Everything the
//! engine writes goes through them:
//!
//! - fixed-width `byte`, `short`, `int`, `long`, `float`, `double`, `boolean` (little-endian)
//! - variable-length ints/longs, optionally zigzag-mapped ([`varint`])
//! - strings, framed as `varint(char_count + 1)` where `0` means null

mod input;
mod output;
pub mod varint;

pub use input::Input;
pub use output::Output;
