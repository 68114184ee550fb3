//! Object identity ⇄ per-graph reference ids.
//!
//! While writing, the first occurrence of an object gets the next sequential id
//! and its payload is written; later occurrences write only `varint(id + 2)`.
//! While reading, the same positional ids are bound to the objects as they are
//! created, so a later reference resolves to the very same instance.

use crate::collections::{IdentityMap, ObjectMap};
use crate::constants::DEFAULT_RETAINED_CAPACITY;
use crate::error::{ErrorKind, Result};
use crate::object::{Obj, TypeInfo};
use std::any::TypeId;

/// Tracks written and read objects within one graph.
pub trait ReferenceResolver {
    /// Id assigned to `object` earlier in this graph, if any.
    fn written_id(&self, object: &Obj) -> Option<u32>;

    /// Assigns the next id to `object`.
    fn add_written(&mut self, object: &Obj) -> u32;

    /// Reserves the next read id for an object of type `info` that is about to be read.
    fn next_read_id(&mut self, info: &TypeInfo) -> u32;

    /// Binds `object` to a reserved read id.
    fn set_read(&mut self, id: u32, object: Obj);

    /// The object bound to `id`.
    fn read_object(&self, info: &TypeInfo, id: u32) -> Result<Obj>;

    /// Whether objects of this type take part in reference tracking.
    fn uses_references(&self, info: &TypeInfo) -> bool;

    /// Treats `info` as a value type from now on.
    fn mark_value_type(&mut self, info: TypeInfo) {
        let _ = info;
    }

    /// Forgets every id. Called once per completed graph.
    fn reset(&mut self);
}

/// Primitive scalars never take part in reference tracking.
fn builtin_value_types() -> ObjectMap<TypeId, ()> {
    let mut types = ObjectMap::with_capacity(16);
    for id in [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<()>(),
    ] {
        types.put(id, ());
    }
    types
}

/// Resolver backed by an identity map for writes and a list for reads.
#[derive(Debug)]
pub struct MapReferenceResolver {
    written: IdentityMap<u32>,
    read: Vec<Option<Obj>>,
    value_types: ObjectMap<TypeId, ()>,
    retained_capacity: usize,
}

impl Default for MapReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReferenceResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::with_retained_capacity(DEFAULT_RETAINED_CAPACITY)
    }

    /// Creates an empty resolver whose tables shrink to `capacity` on reset.
    pub fn with_retained_capacity(capacity: usize) -> Self {
        Self {
            written: IdentityMap::new(),
            read: Vec::new(),
            value_types: builtin_value_types(),
            retained_capacity: capacity,
        }
    }

    /// Objects written so far in this graph.
    pub fn written_len(&self) -> usize {
        self.written.len()
    }

    /// Read ids reserved so far in this graph.
    pub fn read_len(&self) -> usize {
        self.read.len()
    }
}

impl ReferenceResolver for MapReferenceResolver {
    fn written_id(&self, object: &Obj) -> Option<u32> {
        self.written.get(object).copied()
    }

    fn add_written(&mut self, object: &Obj) -> u32 {
        let id = self.written.len() as u32;
        self.written.put(object.clone(), id);
        id
    }

    fn next_read_id(&mut self, _info: &TypeInfo) -> u32 {
        let id = self.read.len() as u32;
        self.read.push(None);
        id
    }

    fn set_read(&mut self, id: u32, object: Obj) {
        if let Some(slot) = self.read.get_mut(id as usize) {
            *slot = Some(object);
        }
    }

    fn read_object(&self, _info: &TypeInfo, id: u32) -> Result<Obj> {
        self.read
            .get(id as usize)
            .and_then(Option::clone)
            .ok_or_else(|| ErrorKind::UnboundReference(id).into())
    }

    fn uses_references(&self, info: &TypeInfo) -> bool {
        !self.value_types.contains_key(&info.id())
    }

    fn mark_value_type(&mut self, info: TypeInfo) {
        self.value_types.put(info.id(), ());
    }

    fn reset(&mut self) {
        self.written.clear_to(self.retained_capacity);
        self.read.clear();
        self.read.shrink_to(self.retained_capacity);
    }
}

/// Resolver backed by plain lists; written ids are found by linear scan.
///
/// Faster than [`MapReferenceResolver`] for graphs with only a handful of
/// shared objects.
#[derive(Debug)]
pub struct ListReferenceResolver {
    written: Vec<Obj>,
    read: Vec<Option<Obj>>,
    value_types: ObjectMap<TypeId, ()>,
}

impl Default for ListReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ListReferenceResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            read: Vec::new(),
            value_types: builtin_value_types(),
        }
    }
}

impl ReferenceResolver for ListReferenceResolver {
    fn written_id(&self, object: &Obj) -> Option<u32> {
        self.written
            .iter()
            .position(|written| written.ptr_eq(object))
            .map(|index| index as u32)
    }

    fn add_written(&mut self, object: &Obj) -> u32 {
        self.written.push(object.clone());
        (self.written.len() - 1) as u32
    }

    fn next_read_id(&mut self, _info: &TypeInfo) -> u32 {
        self.read.push(None);
        (self.read.len() - 1) as u32
    }

    fn set_read(&mut self, id: u32, object: Obj) {
        if let Some(slot) = self.read.get_mut(id as usize) {
            *slot = Some(object);
        }
    }

    fn read_object(&self, _info: &TypeInfo, id: u32) -> Result<Obj> {
        self.read
            .get(id as usize)
            .and_then(Option::clone)
            .ok_or_else(|| ErrorKind::UnboundReference(id).into())
    }

    fn uses_references(&self, info: &TypeInfo) -> bool {
        !self.value_types.contains_key(&info.id())
    }

    fn mark_value_type(&mut self, info: TypeInfo) {
        self.value_types.put(info.id(), ());
    }

    fn reset(&mut self) {
        self.written.clear();
        self.read.clear();
    }
}
