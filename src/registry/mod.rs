//! The type registry: runtime types ⇄ compact wire ids.
//!
//! Registered types get a small non-negative id, written as `varint(id + 2)`.
//! Class header values `0` and `1` are reserved: `0` is null, `1` introduces a
//! type written by name. A by-name type is sent as a per-graph name id followed,
//! the first time only, by its fully qualified name.
//!
//! When registration is not required, an unknown type is registered implicitly
//! on first use with a codec from the [`DefaultCodecs`] table and is written by
//! name from then on.

mod defaults;
mod registration;

pub use defaults::{CodecFactory, DefaultCodecs, TypeMatcher, codable_factory};
pub use registration::Registration;

use crate::codec::Codec;
use crate::collections::{IntMap, ObjectMap};
use crate::constants::{DEFAULT_RETAINED_CAPACITY, MAX_REGISTRATION_ID, NAME, NULL};
use crate::error::{ErrorKind, Result, TangleError};
use crate::io::{Input, Output};
use crate::object::TypeInfo;
use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Maps types to registrations and writes and reads class headers.
pub struct TypeRegistry {
    id_to_registration: IntMap<Rc<Registration>>,
    type_to_registration: ObjectMap<TypeId, Rc<Registration>>,
    known_types: ObjectMap<&'static str, TypeInfo>,
    defaults: DefaultCodecs,
    registration_required: bool,
    warn_unregistered: bool,
    next_register_id: u32,
    retained_capacity: usize,

    // Graph-scoped name ids, only used when registration is not required.
    type_to_name_id: ObjectMap<TypeId, u32>,
    name_id_to_type: IntMap<TypeInfo>,
    next_name_id: u32,

    generation: Cell<u64>,
    memo_type: RefCell<Option<(u64, TypeId, Rc<Registration>)>>,
    memo_id: RefCell<Option<(u64, u32, Rc<Registration>)>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registrations", &self.type_to_registration.len())
            .field("registration_required", &self.registration_required)
            .field("next_register_id", &self.next_register_id)
            .field("named_in_graph", &self.next_name_id)
            .finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(DefaultCodecs::with_builtins())
    }
}

impl TypeRegistry {
    /// Creates a strict registry with no registrations.
    pub fn new(defaults: DefaultCodecs) -> Self {
        let mut registry = Self {
            id_to_registration: IntMap::new(),
            type_to_registration: ObjectMap::new(),
            known_types: ObjectMap::new(),
            defaults,
            registration_required: true,
            warn_unregistered: false,
            next_register_id: 0,
            retained_capacity: DEFAULT_RETAINED_CAPACITY,
            type_to_name_id: ObjectMap::new(),
            name_id_to_type: IntMap::new(),
            next_name_id: 0,
            generation: Cell::new(0),
            memo_type: RefCell::new(None),
            memo_id: RefCell::new(None),
        };
        let exact: Vec<TypeInfo> = registry.defaults.exact_types().collect();
        for info in exact {
            registry.declare(info);
        }
        registry
    }

    // --- Settings ---

    /// Whether unknown types are rejected.
    pub fn registration_required(&self) -> bool {
        self.registration_required
    }

    /// Sets whether unknown types are rejected.
    pub fn set_registration_required(&mut self, required: bool) {
        self.registration_required = required;
    }

    /// Sets whether implicit registrations are logged as warnings.
    pub fn set_warn_unregistered(&mut self, warn: bool) {
        self.warn_unregistered = warn;
    }

    /// Sets the capacity graph-scoped tables shrink to on reset.
    pub fn set_retained_capacity(&mut self, capacity: usize) {
        self.retained_capacity = capacity;
    }

    /// The default codec table.
    pub fn defaults(&self) -> &DefaultCodecs {
        &self.defaults
    }

    /// The default codec table, mutably.
    pub fn defaults_mut(&mut self) -> &mut DefaultCodecs {
        &mut self.defaults
    }

    /// Makes `info` resolvable by name when read, without registering it.
    pub fn declare(&mut self, info: TypeInfo) {
        self.known_types.put(info.name(), info);
    }

    /// Looks up a declared or registered type by its fully qualified name.
    pub fn type_by_name(&self, name: &str) -> Option<TypeInfo> {
        self.known_types.get(name).copied()
    }

    fn invalidate(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    // --- Registration ---

    /// Registers `info` with the lowest free id, or replaces the codec of an
    /// existing registration in place.
    pub fn register(&mut self, info: TypeInfo, codec: Rc<dyn Codec>) -> Result<Rc<Registration>> {
        if let Some(existing) = self.resolve(info.id()) {
            existing.set_codec(codec);
            log::debug!("Updated codec of {existing:?}");
            return Ok(existing);
        }
        let id = self.next_registration_id()?;
        self.register_with_id(info, codec, id)
    }

    /// Registers `info` under `id`.
    ///
    /// If `info` already holds `id` the codec is replaced in place. A different
    /// type holding `id` is unregistered first.
    pub fn register_with_id(
        &mut self,
        info: TypeInfo,
        codec: Rc<dyn Codec>,
        id: u32,
    ) -> Result<Rc<Registration>> {
        if id > MAX_REGISTRATION_ID {
            return Err(ErrorKind::Config(format!(
                "registration id must be <= {MAX_REGISTRATION_ID}: {id}"
            ))
            .into());
        }

        if let Some(old) = self.resolve_id(id) {
            if old.type_info() == info {
                old.set_codec(codec);
                log::debug!("Updated codec of {old:?}");
                return Ok(old);
            }
            log::debug!("Overwriting {old:?} with id {id} for {}", info.name());
            self.type_to_registration.remove(&old.type_info().id());
        }
        if let Some(previous) = self.type_to_registration.remove(&info.id())
            && let Some(previous_id) = previous.id()
        {
            self.id_to_registration.remove(previous_id as i32);
            self.next_register_id = self.next_register_id.min(previous_id);
        }

        let registration = Rc::new(Registration::new(info, codec, Some(id)));
        self.id_to_registration.put(id as i32, Rc::clone(&registration));
        self.type_to_registration
            .put(info.id(), Rc::clone(&registration));
        self.declare(info);
        self.invalidate();
        log::debug!("Registered {registration:?}");
        Ok(registration)
    }

    /// Lowest id not held by any registration.
    fn next_registration_id(&mut self) -> Result<u32> {
        while self.next_register_id <= MAX_REGISTRATION_ID {
            if !self.id_to_registration.contains_key(self.next_register_id as i32) {
                return Ok(self.next_register_id);
            }
            self.next_register_id += 1;
        }
        Err(TangleError::internal("no registration ids available"))
    }

    /// Registers `info` to be written by name, using the default codec table.
    fn register_implicit(&mut self, info: TypeInfo) -> Result<Rc<Registration>> {
        let codec = self.defaults.codec_for(&info)?;
        if self.warn_unregistered {
            log::warn!(
                "Class is not registered: {}\nNote: to register this class use: tangle.register::<{}>();",
                info.name(),
                info.name()
            );
        }
        let registration = Rc::new(Registration::new(info, codec, None));
        self.type_to_registration
            .put(info.id(), Rc::clone(&registration));
        self.declare(info);
        self.invalidate();
        log::debug!("Registered {registration:?} implicitly");
        Ok(registration)
    }

    /// Removes the registration holding `id`.
    pub fn unregister(&mut self, id: u32) -> Option<Rc<Registration>> {
        let registration = self.id_to_registration.remove(id as i32)?;
        self.type_to_registration
            .remove(&registration.type_info().id());
        self.next_register_id = self.next_register_id.min(id);
        self.invalidate();
        log::debug!("Unregistered {registration:?}");
        Some(registration)
    }

    /// Removes every registration.
    pub fn unregister_all(&mut self) {
        self.id_to_registration.clear();
        self.type_to_registration.clear();
        self.next_register_id = 0;
        self.invalidate();
    }

    // --- Resolution ---

    /// The registration of a type, if any.
    pub fn resolve(&self, type_id: TypeId) -> Option<Rc<Registration>> {
        let generation = self.generation.get();
        if let Some((memo_generation, memo_type, registration)) = &*self.memo_type.borrow()
            && *memo_generation == generation
            && *memo_type == type_id
        {
            return Some(Rc::clone(registration));
        }
        let registration = self.type_to_registration.get(&type_id).cloned()?;
        *self.memo_type.borrow_mut() = Some((generation, type_id, Rc::clone(&registration)));
        Some(registration)
    }

    /// The registration holding `id`, if any.
    pub fn resolve_id(&self, id: u32) -> Option<Rc<Registration>> {
        let generation = self.generation.get();
        if let Some((memo_generation, memo_id, registration)) = &*self.memo_id.borrow()
            && *memo_generation == generation
            && *memo_id == id
        {
            return Some(Rc::clone(registration));
        }
        let registration = self.id_to_registration.get(id as i32).cloned()?;
        *self.memo_id.borrow_mut() = Some((generation, id, Rc::clone(&registration)));
        Some(registration)
    }

    /// The registration of `info`, registering it implicitly if allowed.
    pub fn registration(&mut self, info: &TypeInfo) -> Result<Rc<Registration>> {
        if let Some(registration) = self.resolve(info.id()) {
            return Ok(registration);
        }
        if self.registration_required {
            return Err(ErrorKind::UnregisteredType(info.name().to_string()).into());
        }
        self.register_implicit(*info)
    }

    /// Iterates over all registrations, in no particular order.
    pub fn registrations(&self) -> impl Iterator<Item = &Rc<Registration>> + '_ {
        self.type_to_registration.values()
    }

    // --- Class headers ---

    /// Writes the class header for `info`, or null.
    ///
    /// The registration is resolved before anything is written, so a resolution
    /// fault leaves `output` untouched.
    pub fn write_type(
        &mut self,
        output: &mut Output,
        info: Option<&TypeInfo>,
    ) -> Result<Option<Rc<Registration>>> {
        let Some(info) = info else {
            output.write_var_int(NULL, true)?;
            return Ok(None);
        };
        self.write_class(output, info).map(Some)
    }

    /// Writes the class header for a non-null `info`.
    pub fn write_class(&mut self, output: &mut Output, info: &TypeInfo) -> Result<Rc<Registration>> {
        let registration = self.registration(info)?;
        match registration.id() {
            Some(id) => {
                output.write_var_int(id as i32 + 2, true)?;
            }
            None => self.write_name(output, info)?,
        }
        log::trace!("Write class: {}", info.name());
        Ok(registration)
    }

    fn write_name(&mut self, output: &mut Output, info: &TypeInfo) -> Result<()> {
        output.write_var_int(NAME, true)?;
        if let Some(&name_id) = self.type_to_name_id.get(&info.id()) {
            output.write_var_int(name_id as i32, true)?;
            return Ok(());
        }
        let name_id = self.next_name_id;
        self.next_name_id += 1;
        self.type_to_name_id.put(info.id(), name_id);
        output.write_var_int(name_id as i32, true)?;
        output.write_string(Some(info.name()))?;
        Ok(())
    }

    /// Reads a class header. `None` means null.
    pub fn read_type(&mut self, input: &mut Input) -> Result<Option<Rc<Registration>>> {
        let class_id = input.read_var_int(true)?;
        match class_id {
            NULL => Ok(None),
            NAME => self.read_name(input).map(Some),
            _ => {
                let id = u32::try_from(class_id - 2)
                    .map_err(|_| TangleError::format(format!("invalid class id {class_id}")))?;
                let registration = self
                    .resolve_id(id)
                    .ok_or(ErrorKind::UnregisteredId(id))?;
                log::trace!("Read class {id}: {}", registration.type_info().name());
                Ok(Some(registration))
            }
        }
    }

    fn read_name(&mut self, input: &mut Input) -> Result<Rc<Registration>> {
        let name_id = input.read_var_int(true)?;
        if let Some(info) = self.name_id_to_type.get(name_id).copied() {
            return self.registration(&info);
        }
        let name = input
            .read_string()?
            .ok_or_else(|| TangleError::format("null class name"))?;
        let info = self
            .type_by_name(&name)
            .ok_or(ErrorKind::TypeNotFound(name))?;
        self.name_id_to_type.put(name_id, info);
        log::trace!("Read class name: {}", info.name());
        self.registration(&info)
    }

    /// Clears graph-scoped name ids. Does nothing when registration is required.
    pub fn reset(&mut self) {
        if self.registration_required {
            return;
        }
        self.type_to_name_id.clear_to(self.retained_capacity);
        self.name_id_to_type.clear_to(self.retained_capacity);
        self.next_name_id = 0;
    }

    /// Name ids assigned in the current graph.
    pub fn named_in_graph(&self) -> u32 {
        self.next_name_id
    }
}
