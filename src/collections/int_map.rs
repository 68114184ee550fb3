use super::{DEFAULT_LOAD_FACTOR, table_size, validate_load_factor};
use crate::error::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;

const EMPTY: i32 = 0;
const PRIME2: u32 = 0xb4b8_2e39;
const PRIME3: u32 = 0xced1_c241;
const PRIME4: u32 = 0xbe1f_14b1;
const RNG_SEED: u64 = 0x5EED_1DE4;

/// An unordered map from `i32` keys to values, using cuckoo hashing.
///
/// Lookups probe at most 3 slots (4 once the table reaches 2^16 slots) and then a
/// small stash. Key `0` marks an empty slot, so its value is stored out of band.
///
/// Insertion evicts a pseudo-random occupant when all candidate slots are taken and
/// walks the evicted entry to one of its own alternate slots. If the walk does not
/// settle within `push_iterations` steps the last evicted entry goes to the stash;
/// when the stash is full the table doubles and every entry is rehashed. The
/// eviction choices come from a fixed-seed generator, so the same sequence of
/// operations always yields the same layout.
pub struct IntMap<V> {
    keys: Vec<i32>,
    values: Vec<Option<V>>,
    zero_value: Option<V>,
    size: usize,
    capacity: usize,
    stash_size: usize,
    load_factor: f32,
    hash_shift: u32,
    mask: u32,
    threshold: usize,
    stash_capacity: usize,
    push_iterations: usize,
    big_table: bool,
    rng: SmallRng,
}

impl<V: fmt::Debug> fmt::Debug for IntMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> Default for IntMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntMap<V> {
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
            keys: Vec::new(),
            values: Vec::new(),
            zero_value: None,
            size: 0,
            capacity: 0,
            stash_size: 0,
            load_factor,
            hash_shift: 0,
            mask: 0,
            threshold: 0,
            stash_capacity: 0,
            push_iterations: 0,
            big_table: false,
            rng: SmallRng::seed_from_u64(RNG_SEED),
        };
        map.allocate(capacity);
        map
    }

    /// Sets the table geometry for `capacity` and allocates empty arrays.
    fn allocate(&mut self, capacity: usize) {
        let log2 = capacity.trailing_zeros();
        self.capacity = capacity;
        self.threshold = (capacity as f64 * f64::from(self.load_factor)) as usize;
        self.mask = (capacity - 1) as u32;
        self.hash_shift = 31 - log2;
        self.stash_capacity = 3.max(2 * log2 as usize);
        self.push_iterations = capacity.min(8).max((capacity as f64).sqrt() as usize / 8);
        self.big_table = capacity >> 16 != 0;
        self.stash_size = 0;

        let slots = capacity + self.stash_capacity;
        self.keys = vec![EMPTY; slots];
        self.values = std::iter::repeat_with(|| None).take(slots).collect();
    }

    /// Number of entries, including the one stored under key `0`.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Slots in the main table (a power of two), not counting the stash.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries currently held in the overflow stash.
    pub fn stash_len(&self) -> usize {
        self.stash_size
    }

    #[inline]
    fn hash(&self, key: i32, prime: u32) -> usize {
        let h = (key as u32).wrapping_mul(prime);
        ((h ^ (h >> self.hash_shift)) & self.mask) as usize
    }

    /// Candidate slots for `key`; only the first [`Self::hash_count`] are used.
    #[inline]
    fn slots(&self, key: i32) -> [usize; 4] {
        [
            (key as u32 & self.mask) as usize,
            self.hash(key, PRIME2),
            self.hash(key, PRIME3),
            self.hash(key, PRIME4),
        ]
    }

    #[inline]
    fn hash_count(&self) -> usize {
        if self.big_table { 4 } else { 3 }
    }

    fn find_index(&self, key: i32) -> Option<usize> {
        let slots = self.slots(key);
        if let Some(&index) = slots[..self.hash_count()]
            .iter()
            .find(|&&index| self.keys[index] == key)
        {
            return Some(index);
        }
        (self.capacity..self.capacity + self.stash_size).find(|&index| self.keys[index] == key)
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: i32) -> Option<&V> {
        if key == EMPTY {
            return self.zero_value.as_ref();
        }
        self.find_index(key).and_then(|index| self.values[index].as_ref())
    }

    /// Returns the value for `key` mutably.
    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        if key == EMPTY {
            return self.zero_value.as_mut();
        }
        let index = self.find_index(key)?;
        self.values[index].as_mut()
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: i32) -> bool {
        if key == EMPTY {
            self.zero_value.is_some()
        } else {
            self.find_index(key).is_some()
        }
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn put(&mut self, key: i32, value: V) -> Option<V> {
        if key == EMPTY {
            let old = self.zero_value.replace(value);
            if old.is_none() {
                self.size += 1;
            }
            return old;
        }

        if let Some(index) = self.find_index(key) {
            return self.values[index].replace(value);
        }

        let slots = self.slots(key);
        for &index in &slots[..self.hash_count()] {
            if self.keys[index] == EMPTY {
                self.occupy(index, key, value);
                return None;
            }
        }
        self.push(key, value);
        None
    }

    /// Inserts a key known to be absent. Used while rehashing.
    fn put_resize(&mut self, key: i32, value: V) {
        let slots = self.slots(key);
        for &index in &slots[..self.hash_count()] {
            if self.keys[index] == EMPTY {
                self.occupy(index, key, value);
                return;
            }
        }
        self.push(key, value);
    }

    fn occupy(&mut self, index: usize, key: i32, value: V) {
        self.keys[index] = key;
        self.values[index] = Some(value);
        self.size += 1;
        if self.size > self.threshold {
            self.resize(self.capacity << 1);
        }
    }

    /// Bounded random walk of evictions, ending in the stash.
    fn push(&mut self, key: i32, value: V) {
        let mut key = key;
        let mut value = value;
        let count = self.hash_count();
        for _ in 0..self.push_iterations {
            let choice = self.rng.gen_range(0..count);
            let victim = self.slots(key)[choice];
            let evicted_key = std::mem::replace(&mut self.keys[victim], key);
            let Some(evicted_value) = self.values[victim].replace(value) else {
                // The chosen slot was free after all.
                self.size += 1;
                if self.size > self.threshold {
                    self.resize(self.capacity << 1);
                }
                return;
            };

            let slots = self.slots(evicted_key);
            if let Some(&index) = slots[..count]
                .iter()
                .find(|&&index| self.keys[index] == EMPTY)
            {
                self.occupy(index, evicted_key, evicted_value);
                return;
            }
            key = evicted_key;
            value = evicted_value;
        }
        self.put_stash(key, value);
    }

    fn put_stash(&mut self, key: i32, value: V) {
        if self.stash_size == self.stash_capacity {
            self.resize(self.capacity << 1);
            self.put_resize(key, value);
            return;
        }
        let index = self.capacity + self.stash_size;
        self.keys[index] = key;
        self.values[index] = Some(value);
        self.stash_size += 1;
        self.size += 1;
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: i32) -> Option<V> {
        if key == EMPTY {
            let old = self.zero_value.take();
            if old.is_some() {
                self.size -= 1;
            }
            return old;
        }

        let index = self.find_index(key)?;
        let old = self.values[index].take();
        self.keys[index] = EMPTY;
        self.size -= 1;
        if index >= self.capacity {
            self.remove_stash_index(index);
        }
        old
    }

    /// Backfills a vacated stash slot with the last stash entry.
    fn remove_stash_index(&mut self, index: usize) {
        self.stash_size -= 1;
        let last = self.capacity + self.stash_size;
        if index < last {
            self.keys[index] = std::mem::replace(&mut self.keys[last], EMPTY);
            self.values[index] = self.values[last].take();
        }
    }

    /// Grows the table so `additional` more entries fit without resizing.
    pub fn ensure_capacity(&mut self, additional: usize) {
        let needed = self.size + additional;
        if needed >= self.threshold {
            self.resize(table_size(needed, self.load_factor, 2));
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        let old_end = self.capacity + self.stash_size;
        let old_keys = std::mem::take(&mut self.keys);
        let mut old_values = std::mem::take(&mut self.values);
        self.allocate(new_capacity);
        self.size = usize::from(self.zero_value.is_some());

        for (key, value) in old_keys
            .into_iter()
            .zip(old_values.iter_mut())
            .take(old_end)
        {
            if key == EMPTY {
                continue;
            }
            if let Some(value) = value.take() {
                self.put_resize(key, value);
            }
        }
    }

    /// Removes every entry, keeping the current capacity.
    pub fn clear(&mut self) {
        self.keys.fill(EMPTY);
        self.values.iter_mut().for_each(|value| *value = None);
        self.zero_value = None;
        self.size = 0;
        self.stash_size = 0;
    }

    /// Removes every entry and shrinks the table if it holds more than
    /// `max_capacity` slots.
    pub fn clear_to(&mut self, max_capacity: usize) {
        let target = max_capacity.max(2).next_power_of_two();
        if self.capacity <= target {
            self.clear();
            return;
        }
        self.zero_value = None;
        self.size = 0;
        self.allocate(target);
    }

    /// Iterates over all entries in table order, the key `0` entry first.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &V)> + '_ {
        let zero = self.zero_value.as_ref().map(|value| (EMPTY, value));
        let end = self.capacity + self.stash_size;
        let table = self.keys[..end]
            .iter()
            .zip(&self.values[..end])
            .filter_map(|(&key, value)| match value {
                Some(value) if key != EMPTY => Some((key, value)),
                _ => None,
            });
        zero.into_iter().chain(table)
    }

    /// Iterates over all keys.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over all values.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}
