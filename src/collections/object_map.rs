use super::hashing::{fibonacci_place, hash_key};
use super::{DEFAULT_LOAD_FACTOR, table_size, validate_load_factor};
use crate::error::Result;
use crate::object::Obj;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// How an [`ObjectMap`] hashes and compares its keys.
///
/// Implementations must be consistent: keys that are equivalent hash the same.
pub trait KeyEquivalence<Q: ?Sized> {
    /// Hash code of `key`. The table spreads it with a Fibonacci multiply.
    fn hash(key: &Q) -> u64;

    /// Whether `a` and `b` denote the same key.
    fn equivalent(a: &Q, b: &Q) -> bool;
}

/// Keys compared by value (`Eq`) and hashed by content (XxHash64).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentEquality;

impl<Q: Hash + Eq + ?Sized> KeyEquivalence<Q> for ContentEquality {
    #[inline]
    fn hash(key: &Q) -> u64 {
        hash_key(key)
    }

    #[inline]
    fn equivalent(a: &Q, b: &Q) -> bool {
        a == b
    }
}

/// [`Obj`] keys compared by allocation, never by content.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEquality;

impl KeyEquivalence<Obj> for IdentityEquality {
    #[inline]
    fn hash(key: &Obj) -> u64 {
        key.addr() as u64
    }

    #[inline]
    fn equivalent(a: &Obj, b: &Obj) -> bool {
        a.ptr_eq(b)
    }
}

/// An [`ObjectMap`] keyed by object identity.
pub type IdentityMap<V> = ObjectMap<Obj, V, IdentityEquality>;

/// An unordered map using linear probing.
///
/// The ideal slot of a key is `(hash * 0x9E3779B97F4A7C15) >> (64 - log2(capacity))`;
/// collisions probe forward one slot at a time. Removal shifts later entries of
/// the same probe run backward instead of leaving tombstones. The table doubles
/// once the number of entries exceeds `capacity * load_factor`.
pub struct ObjectMap<K, V, E = ContentEquality> {
    slots: Vec<Option<(K, V)>>,
    size: usize,
    load_factor: f32,
    threshold: usize,
    mask: usize,
    shift: u32,
    _equivalence: PhantomData<E>,
}

impl<K: fmt::Debug, V: fmt::Debug, E> fmt::Debug for ObjectMap<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().flatten().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K, V, E: KeyEquivalence<K>> Default for ObjectMap<K, V, E> {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_slots<K, V>(capacity: usize) -> Vec<Option<(K, V)>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl<K, V, E: KeyEquivalence<K>> ObjectMap<K, V, E> {
    /// Creates a map with room for 51 entries before resizing.
    pub fn new() -> Self {
        Self::with_capacity(51)
    }

    /// Creates a map with room for `entries` entries before resizing.
    pub fn with_capacity(entries: usize) -> Self {
        Self::build(table_size(entries, DEFAULT_LOAD_FACTOR, 2), DEFAULT_LOAD_FACTOR)
    }

    /// Creates a map with a custom load factor, which must lie in `(0, 1)`.
    pub fn with_load_factor(entries: usize, load_factor: f32) -> Result<Self> {
        let load_factor = validate_load_factor(load_factor)?;
        Ok(Self::build(table_size(entries, load_factor, 2), load_factor))
    }

    fn build(capacity: usize, load_factor: f32) -> Self {
        let mut map = Self {
            slots: Vec::new(),
            size: 0,
            load_factor,
            threshold: 0,
            mask: 0,
            shift: 0,
            _equivalence: PhantomData,
        };
        map.allocate(capacity);
        map
    }

    fn allocate(&mut self, capacity: usize) {
        self.threshold = (capacity as f64 * f64::from(self.load_factor)) as usize;
        self.mask = capacity - 1;
        self.shift = 64 - capacity.trailing_zeros();
        self.slots = empty_slots(capacity);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Slots in the table (a power of two).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn place<Q: ?Sized>(&self, key: &Q) -> usize
    where
        E: KeyEquivalence<Q>,
    {
        fibonacci_place(E::hash(key), self.shift)
    }

    /// `Ok(index)` of the entry for `key`, or `Err(index)` of the empty slot ending its probe run.
    fn locate<Q: ?Sized>(&self, key: &Q) -> std::result::Result<usize, usize>
    where
        K: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        let mut index = self.place(key);
        loop {
            match &self.slots[index] {
                None => return Err(index),
                Some((stored, _)) if E::equivalent(stored.borrow(), key) => return Ok(index),
                Some(_) => index = (index + 1) & self.mask,
            }
        }
    }

    /// Returns the value for `key`.
    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        let index = self.locate(key).ok()?;
        self.slots[index].as_ref().map(|(_, value)| value)
    }

    /// Returns the value for `key` mutably.
    pub fn get_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        let index = self.locate(key).ok()?;
        self.slots[index].as_mut().map(|(_, value)| value)
    }

    /// Returns true if `key` is present.
    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        self.locate(key).is_ok()
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.locate(&key) {
            Ok(index) => self.slots[index]
                .as_mut()
                .map(|(_, stored)| std::mem::replace(stored, value)),
            Err(index) => {
                self.slots[index] = Some((key, value));
                self.size += 1;
                if self.size > self.threshold {
                    self.resize(self.slots.len() << 1);
                }
                None
            }
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        let mut vacant = self.locate(key).ok()?;
        let removed = self.slots[vacant].take();
        let mask = self.mask;
        let mut next = (vacant + 1) & mask;
        loop {
            let ideal = match &self.slots[next] {
                Some((stored, _)) => self.place(stored),
                None => break,
            };
            // Pull the entry back if the vacant slot is closer to where it wants to be.
            if (next.wrapping_sub(ideal) & mask) > (vacant.wrapping_sub(ideal) & mask) {
                self.slots[vacant] = self.slots[next].take();
                vacant = next;
            }
            next = (next + 1) & mask;
        }
        self.size -= 1;
        removed.map(|(_, value)| value)
    }

    /// Grows the table so `additional` more entries fit without resizing.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.size + additional;
        if needed >= self.threshold {
            self.resize(table_size(needed, self.load_factor, 2));
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        let old = std::mem::take(&mut self.slots);
        self.allocate(new_capacity);
        for (key, value) in old.into_iter().flatten() {
            let mut index = self.place(&key);
            while self.slots[index].is_some() {
                index = (index + 1) & self.mask;
            }
            self.slots[index] = Some((key, value));
        }
    }

    /// Removes every entry, keeping the current capacity.
    pub fn clear(&mut self) {
        if self.size == 0 {
            return;
        }
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.size = 0;
    }

    /// Removes every entry and shrinks the table if it holds more than
    /// `max_capacity` entries' worth of slots.
    pub fn clear_to(&mut self, max_capacity: usize) {
        let target = table_size(max_capacity, self.load_factor, 2);
        if self.slots.len() <= target {
            self.clear();
            return;
        }
        self.size = 0;
        self.allocate(target);
    }

    /// Iterates over all entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.slots.iter().flatten().map(|(key, value)| (key, value))
    }

    /// Iterates over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over all values.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}
