//! Open-addressing hash tables backing the registry and the reference resolver.
//!
//! - [`IntMap`]: cuckoo hashing keyed by `i32`, with a small overflow stash. Used for
//!   id → registration lookups on the read path.
//! - [`ObjectMap`]: linear probing with Fibonacci hashing and backward-shift deletion.
//!   The key-equivalence strategy is a type parameter: [`ContentEquality`] for keys
//!   compared by value, [`IdentityEquality`] for [`crate::Obj`] keys compared by
//!   allocation.
//!
//! Neither table ever leaves tombstones, and both can be shrunk back with
//! `clear_to` so one long-lived engine does not keep the memory of its largest graph.

mod hashing;
mod int_map;
mod object_map;

pub use hashing::hash_key;
pub use int_map::IntMap;
pub use object_map::{ContentEquality, IdentityEquality, IdentityMap, KeyEquivalence, ObjectMap};

use crate::error::{ErrorKind, Result};

/// Default load factor of both tables.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.8;

pub(crate) fn validate_load_factor(load_factor: f32) -> Result<f32> {
    if load_factor > 0.0 && load_factor < 1.0 {
        Ok(load_factor)
    } else {
        Err(ErrorKind::Config(format!("load factor must be in (0, 1): {load_factor}")).into())
    }
}

/// Smallest power of two holding `entries` at `load_factor`, never below `min`.
pub(crate) fn table_size(entries: usize, load_factor: f32, min: usize) -> usize {
    let wanted = (entries as f64 / f64::from(load_factor)).ceil() as usize;
    wanted.max(min).next_power_of_two()
}
