#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tangle::Obj;
use tangle::collections::{IdentityMap, IntMap, ObjectMap};

// --- IntMap ---

#[test]
fn test_int_map_matches_hash_map_under_random_operations() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut map = IntMap::new();
    let mut model = HashMap::new();

    for step in 0..50_000u32 {
        let key = rng.gen_range(-2_000..2_000);
        if rng.gen_bool(0.7) {
            assert_eq!(map.put(key, step), model.insert(key, step), "put {key}");
        } else {
            assert_eq!(map.remove(key), model.remove(&key), "remove {key}");
        }
        assert_eq!(map.len(), model.len());
    }

    for (key, value) in &model {
        assert_eq!(map.get(*key), Some(value));
    }
    let mut seen: Vec<i32> = map.keys().collect();
    seen.sort_unstable();
    let mut expected: Vec<i32> = model.keys().copied().collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
}

#[test]
fn test_int_map_zero_key_is_a_normal_key() {
    let mut map = IntMap::with_capacity(4);
    assert!(!map.contains_key(0));
    assert_eq!(map.put(0, "zero"), None);
    assert_eq!(map.put(0, "again"), Some("zero"));
    assert_eq!(map.len(), 1);
    assert_eq!(map.iter().next(), Some((0, &"again")));
    assert_eq!(map.remove(0), Some("again"));
    assert!(map.is_empty());
}

#[test]
fn test_int_map_grows_through_collisions() {
    // Keys sharing low bits collide in every hash; the map must stash or grow.
    let mut map = IntMap::with_capacity(2);
    for i in 1..=4_096 {
        map.put(i << 16, i);
    }
    assert_eq!(map.len(), 4_096);
    for i in 1..=4_096 {
        assert_eq!(map.get(i << 16), Some(&i));
    }
    assert!(map.capacity().is_power_of_two());
}

#[test]
fn test_int_map_stash_removal_keeps_remaining_keys() {
    let mut map = IntMap::with_capacity(2);
    let keys: Vec<i32> = (1..64).map(|i| i * 1_048_576).collect();
    for &key in &keys {
        map.put(key, key);
    }
    for &key in keys.iter().step_by(2) {
        assert_eq!(map.remove(key), Some(key));
    }
    for (i, &key) in keys.iter().enumerate() {
        let expected = (i % 2 == 1).then_some(&key);
        assert_eq!(map.get(key), expected);
    }
}

#[test]
fn test_int_map_clear_to_shrinks() {
    let mut map = IntMap::new();
    for i in 0..10_000 {
        map.put(i, ());
    }
    let grown = map.capacity();
    map.clear_to(64);
    assert!(map.is_empty());
    assert!(map.capacity() < grown);
    assert!(map.capacity() <= 128);
    map.put(5, ());
    assert!(map.contains_key(5));
}

#[test]
fn test_int_map_get_mut_and_ensure_capacity() {
    let mut map = IntMap::new();
    map.ensure_capacity(1_000);
    let capacity = map.capacity();
    for i in 0..800 {
        map.put(i, i);
    }
    assert_eq!(map.capacity(), capacity);
    if let Some(value) = map.get_mut(10) {
        *value = -1;
    }
    assert_eq!(map.get(10), Some(&-1));
}

#[test]
fn test_int_map_rejects_bad_load_factor() {
    assert!(IntMap::<()>::with_load_factor(16, 0.0).is_err());
    assert!(IntMap::<()>::with_load_factor(16, 1.0).is_err());
    assert!(IntMap::<()>::with_load_factor(16, 0.5).is_ok());
}

// --- ObjectMap ---

#[test]
fn test_object_map_matches_hash_map_under_random_operations() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut map: ObjectMap<String, u32> = ObjectMap::with_capacity(4);
    let mut model = HashMap::new();

    for step in 0..20_000u32 {
        let key = format!("key-{}", rng.gen_range(0..1_500));
        if rng.gen_bool(0.6) {
            assert_eq!(map.put(key.clone(), step), model.insert(key, step));
        } else {
            assert_eq!(map.remove(key.as_str()), model.remove(&key));
        }
        assert_eq!(map.len(), model.len());
    }

    for (key, value) in &model {
        assert_eq!(map.get(key.as_str()), Some(value));
    }
    assert_eq!(map.iter().count(), model.len());
}

#[test]
fn test_object_map_removal_keeps_probe_chains() {
    // A tiny table forces long clusters; every deletion must keep later keys reachable.
    let mut map: ObjectMap<u64, u64> = ObjectMap::with_load_factor(2, 0.9).expect("valid load factor");
    for key in 0..200 {
        map.put(key, key * 2);
    }
    for key in (0..200).filter(|k| k % 3 == 0) {
        assert_eq!(map.remove(&key), Some(key * 2));
    }
    for key in 0..200 {
        let expected = (key % 3 != 0).then_some(key * 2);
        assert_eq!(map.get(&key).copied(), expected);
    }
}

#[test]
fn test_object_map_clear_to() {
    let mut map: ObjectMap<u32, ()> = ObjectMap::new();
    for key in 0..5_000 {
        map.put(key, ());
    }
    let grown = map.capacity();
    map.clear_to(32);
    assert!(map.is_empty());
    assert!(map.capacity() < grown);
    assert!(!map.contains_key(&10));
}

#[test]
fn test_identity_map_uses_allocation_not_content() {
    let a = Obj::new(String::from("same"));
    let b = Obj::new(String::from("same"));
    let a_again = a.clone();

    let mut map: IdentityMap<u32> = IdentityMap::new();
    map.put(a.clone(), 1);
    map.put(b.clone(), 2);

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&a_again), Some(&1));
    assert_eq!(map.get(&b), Some(&2));
    assert_eq!(map.put(a_again, 3), Some(1));
    assert_eq!(map.remove(&a), Some(3));
    assert!(!map.contains_key(&a));
}
