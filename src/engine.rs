//! The traversal engine.
//!
//! [`Tangle`] sequences every value it writes as
//!
//! ```text
//! [class header]? [reference header]? [payload]
//! ```
//!
//! resolving the class through the [`TypeRegistry`], the reference through the
//! [`ReferenceResolver`], and handing the payload to the type's [`Codec`]. Codecs
//! call back into the engine for nested values, so the engine sees the whole
//! graph. A depth counter tracks nesting; when it returns to zero the graph is
//! complete and, with auto-reset on, all graph-scoped state is cleared.
//!
//! Deep copy is a separate traversal with its own depth and its own
//! original → copy identity map. It never touches the wire state.

use crate::codec::{Codable, Codec};
use crate::collections::{IdentityMap, ObjectMap};
use crate::config::TangleConfig;
use crate::constants::{NOT_NULL, NULL};
use crate::error::{ErrorKind, Result, TangleError};
use crate::generics::Generics;
use crate::instantiator::{DefaultInstantiatorStrategy, Instantiator, InstantiatorStrategy};
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use crate::references::{MapReferenceResolver, ReferenceResolver};
use crate::registry::{CodecFactory, Registration, TypeMatcher, TypeRegistry};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Outcome of reading a reference header.
enum ReadReference {
    /// The value is null or an earlier object; no payload follows.
    Resolved(Option<Obj>),
    /// A payload follows. Holds the length of the pending-id stack after the push.
    Pending(usize),
}

/// The object-graph codec engine.
///
/// One engine serves one execution context at a time. It is `!Send`: share it
/// between threads by giving each thread its own instance.
pub struct Tangle {
    config: TangleConfig,
    registry: TypeRegistry,
    resolver: Box<dyn ReferenceResolver>,
    strategy: Box<dyn InstantiatorStrategy>,
    generics: Generics,
    depth: usize,
    read_reference_ids: Vec<Option<u32>>,
    /// Stack length at which the codec being read may bind its object, `0` if none.
    bind_point: usize,

    copy_depth: usize,
    copy_shallow: bool,
    original_to_copy: IdentityMap<Obj>,
    pending_copies: Vec<(Obj, bool)>,

    context: ObjectMap<String, Obj>,
    graph_context: ObjectMap<String, Obj>,
}

impl fmt::Debug for Tangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tangle")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("depth", &self.depth)
            .field("copy_depth", &self.copy_depth)
            .finish()
    }
}

impl Default for Tangle {
    fn default() -> Self {
        Self::new()
    }
}

impl Tangle {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TangleConfig::default())
    }

    /// Creates an engine with `config`.
    pub fn with_config(config: TangleConfig) -> Self {
        let mut registry = TypeRegistry::default();
        registry.set_registration_required(config.registration_required);
        registry.set_warn_unregistered(config.warn_unregistered);
        registry.set_retained_capacity(config.retained_capacity);
        let resolver = MapReferenceResolver::with_retained_capacity(config.retained_capacity);
        Self {
            registry,
            resolver: Box::new(resolver),
            strategy: Box::new(DefaultInstantiatorStrategy),
            generics: Generics::new(),
            depth: 0,
            read_reference_ids: Vec::new(),
            bind_point: 0,
            copy_depth: 0,
            copy_shallow: false,
            original_to_copy: IdentityMap::new(),
            pending_copies: Vec::new(),
            context: ObjectMap::new(),
            graph_context: ObjectMap::new(),
            config,
        }
    }

    // --- Configuration ---

    /// The current configuration.
    pub fn config(&self) -> &TangleConfig {
        &self.config
    }

    /// Enables or disables reference tracking. Returns the previous setting.
    pub fn set_references(&mut self, references: bool) -> bool {
        std::mem::replace(&mut self.config.references, references)
    }

    /// Sets whether unregistered types are rejected.
    pub fn set_registration_required(&mut self, required: bool) {
        self.config.registration_required = required;
        self.registry.set_registration_required(required);
    }

    /// Sets whether implicit registrations are logged as warnings.
    pub fn set_warn_unregistered(&mut self, warn: bool) {
        self.config.warn_unregistered = warn;
        self.registry.set_warn_unregistered(warn);
    }

    /// Sets whether graph-scoped state is reset after every top-level call.
    pub fn set_auto_reset(&mut self, auto_reset: bool) {
        self.config.auto_reset = auto_reset;
    }

    /// Sets the maximum traversal depth.
    pub fn set_max_depth(&mut self, max_depth: Option<usize>) {
        self.config.max_depth = max_depth;
    }

    /// Sets whether copies preserve sharing and cycles.
    pub fn set_copy_references(&mut self, copy_references: bool) {
        self.config.copy_references = copy_references;
    }

    /// Replaces the reference resolver.
    pub fn set_reference_resolver(&mut self, resolver: Box<dyn ReferenceResolver>) {
        self.resolver = resolver;
    }

    /// Replaces the instantiator strategy.
    pub fn set_instantiator_strategy(&mut self, strategy: Box<dyn InstantiatorStrategy>) {
        self.strategy = strategy;
    }

    // --- Registration ---

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The type registry, mutably.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Registers `T` with the lowest free id.
    ///
    /// The codec is an exact default added for `T`, if any, else `T`'s own.
    pub fn register<T: Codable>(&mut self) -> Result<Rc<Registration>> {
        let info = TypeInfo::of::<T>();
        let codec = self.exact_default(&info).unwrap_or_else(T::codec);
        self.registry.register(info, codec)
    }

    /// Registers `T` under `id`.
    pub fn register_id<T: Codable>(&mut self, id: u32) -> Result<Rc<Registration>> {
        let info = TypeInfo::of::<T>();
        let codec = self.exact_default(&info).unwrap_or_else(T::codec);
        self.registry.register_with_id(info, codec, id)
    }

    /// Registers `T` with an explicit codec and the lowest free id.
    pub fn register_with<T: Any>(&mut self, codec: Rc<dyn Codec>) -> Result<Rc<Registration>> {
        self.registry.register(TypeInfo::of::<T>(), codec)
    }

    /// Registers `T` with an explicit codec under `id`.
    pub fn register_with_id<T: Any>(
        &mut self,
        codec: Rc<dyn Codec>,
        id: u32,
    ) -> Result<Rc<Registration>> {
        self.registry.register_with_id(TypeInfo::of::<T>(), codec, id)
    }

    /// Removes the registration holding `id`.
    pub fn unregister(&mut self, id: u32) -> Option<Rc<Registration>> {
        self.registry.unregister(id)
    }

    /// The registration of `T`, if registered.
    pub fn registration<T: Any>(&self) -> Option<Rc<Registration>> {
        self.registry.resolve(std::any::TypeId::of::<T>())
    }

    fn exact_default(&self, info: &TypeInfo) -> Option<Rc<dyn Codec>> {
        let exact = TypeMatcher::Exact(*info);
        self.registry
            .defaults()
            .matchers()
            .any(|matcher| *matcher == exact)
            .then(|| self.registry.defaults().find(info))
            .flatten()
    }

    /// Makes `T` known without registering it: it can be registered implicitly
    /// with its own codec and resolved by name when read.
    pub fn declare<T: Codable>(&mut self) {
        self.registry.defaults_mut().add_codable::<T>();
        self.registry.declare(TypeInfo::of::<T>());
    }

    /// Adds a default codec for exactly `T`. It overrides `T`'s own codec.
    pub fn add_default_codec<T: Any>(&mut self, factory: CodecFactory) {
        let info = TypeInfo::of::<T>();
        self.registry
            .defaults_mut()
            .add(TypeMatcher::Exact(info), factory);
        self.registry.declare(info);
    }

    /// Adds a default codec for every type whose name starts with `prefix`.
    pub fn add_default_family(&mut self, prefix: impl Into<String>, factory: CodecFactory) {
        self.registry
            .defaults_mut()
            .add(TypeMatcher::Family(prefix.into()), factory);
    }

    /// Sets the codec factory used when no default matches.
    pub fn set_default_fallback(&mut self, factory: Option<CodecFactory>) {
        self.registry.defaults_mut().set_fallback(factory);
    }

    /// Excludes `T` from reference tracking.
    pub fn mark_value_type<T: Any>(&mut self) {
        self.resolver.mark_value_type(TypeInfo::of::<T>());
    }

    /// Sets the instantiator of `T`, registering it implicitly if allowed.
    pub fn set_instantiator<T: Any>(&mut self, instantiator: Rc<dyn Instantiator>) -> Result<()> {
        let registration = self.registry.registration(&TypeInfo::of::<T>())?;
        registration.set_instantiator(instantiator);
        Ok(())
    }

    /// Creates an instance of `info` through its registration's instantiator.
    pub fn new_instance(&mut self, info: &TypeInfo) -> Result<Obj> {
        let registration = self.registry.registration(info)?;
        let instantiator = match registration.instantiator() {
            Some(instantiator) => instantiator,
            None => {
                let codec = registration.codec();
                let instantiator = self.strategy.new_instantiator(info, codec.as_ref())?;
                registration.set_instantiator(Rc::clone(&instantiator));
                instantiator
            }
        };
        instantiator.create(info)
    }

    // --- State ---

    /// Current nesting depth, `0` outside any call.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current copy nesting depth.
    pub fn copy_depth(&self) -> usize {
        self.copy_depth
    }

    /// Scratch map living as long as the engine.
    pub fn context(&self) -> &ObjectMap<String, Obj> {
        &self.context
    }

    /// Scratch map living as long as the engine, mutably.
    pub fn context_mut(&mut self) -> &mut ObjectMap<String, Obj> {
        &mut self.context
    }

    /// Scratch map cleared after every graph.
    pub fn graph_context(&self) -> &ObjectMap<String, Obj> {
        &self.graph_context
    }

    /// Scratch map cleared after every graph, mutably.
    pub fn graph_context_mut(&mut self) -> &mut ObjectMap<String, Obj> {
        &mut self.graph_context
    }

    /// The generics stack.
    pub fn generics(&self) -> &Generics {
        &self.generics
    }

    /// The generics stack, mutably. Frames pushed here must be keyed to [`Tangle::depth`].
    pub fn generics_mut(&mut self) -> &mut Generics {
        &mut self.generics
    }

    /// Pushes type arguments for the children of the calling codec.
    pub fn push_generics(&mut self, arguments: Vec<TypeInfo>) {
        self.generics.push_type_arguments(self.depth, arguments);
    }

    /// Pops the type arguments pushed by the calling codec.
    pub fn pop_generics(&mut self) -> Option<Vec<TypeInfo>> {
        self.generics.pop_type_arguments(self.depth)
    }

    /// Type argument `index` pushed by the parent of the calling codec.
    pub fn resolve_generic(&self, index: usize) -> Option<TypeInfo> {
        self.generics.resolve_variable(self.depth, index)
    }

    /// Next type argument pushed by the parent of the calling codec.
    pub fn next_generic(&mut self) -> Option<TypeInfo> {
        self.generics.next_type(self.depth)
    }

    fn begin_object(&mut self) -> Result<()> {
        self.depth += 1;
        if let Some(max) = self.config.max_depth
            && self.depth > max
        {
            self.end_object();
            return Err(ErrorKind::DepthExceeded(max).into());
        }
        Ok(())
    }

    fn end_object(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 && self.config.auto_reset {
            self.reset();
        }
    }

    /// Clears graph-scoped state: name ids, reference ids, the graph context,
    /// and the generics stack. Copy state is cleared too unless a copy is running.
    pub fn reset(&mut self) {
        self.graph_context.clear_to(self.config.retained_capacity);
        self.registry.reset();
        self.resolver.reset();
        self.read_reference_ids.clear();
        self.bind_point = 0;
        self.generics.clear();
        if self.copy_depth == 0 {
            self.clear_copy_state();
        }
        log::trace!("Object graph complete.");
    }

    fn clear_copy_state(&mut self) {
        self.original_to_copy
            .clear_to(self.config.retained_capacity);
        self.pending_copies.clear();
    }

    // --- Writing ---

    /// Writes the class of `value` followed by `value`, or null.
    pub fn write_class_and_object(&mut self, output: &mut Output, value: Option<&Obj>) -> Result<()> {
        self.begin_object()?;
        let result = self.write_class_and_object_inner(output, value);
        self.end_object();
        result
    }

    fn write_class_and_object_inner(&mut self, output: &mut Output, value: Option<&Obj>) -> Result<()> {
        let Some(value) = value else {
            self.registry.write_type(output, None)?;
            return Ok(());
        };
        let info = value.type_info();
        let registration = self.registry.write_class(output, &info)?;
        if self.config.references && self.write_reference_or_null(output, Some(value), false)? {
            return Ok(());
        }
        log::trace!("Write: {}", info.name());
        registration
            .codec()
            .write(self, output, value)
            .map_err(|e| e.with_trace(info.name()))
    }

    /// Writes `value` without its class. The reader must know the type.
    pub fn write_object(&mut self, output: &mut Output, value: &Obj) -> Result<()> {
        let registration = self.registry.registration(&value.type_info())?;
        self.write_object_with(output, value, &registration.codec())
    }

    /// Writes `value` with `codec`, without its class.
    pub fn write_object_with(&mut self, output: &mut Output, value: &Obj, codec: &Rc<dyn Codec>) -> Result<()> {
        self.begin_object()?;
        let result = self.write_object_inner(output, value, codec);
        self.end_object();
        result
    }

    fn write_object_inner(&mut self, output: &mut Output, value: &Obj, codec: &Rc<dyn Codec>) -> Result<()> {
        if self.config.references && self.write_reference_or_null(output, Some(value), false)? {
            return Ok(());
        }
        let info = value.type_info();
        log::trace!("Write: {}", info.name());
        codec
            .write(self, output, value)
            .map_err(|e| e.with_trace(info.name()))
    }

    /// Writes `value` of type `info`, or null, without its class.
    pub fn write_object_or_null(
        &mut self,
        output: &mut Output,
        value: Option<&Obj>,
        info: &TypeInfo,
    ) -> Result<()> {
        let registration = self.registry.registration(info)?;
        self.write_object_or_null_with(output, value, &registration.codec())
    }

    /// Writes `value`, or null, with `codec`, without its class.
    pub fn write_object_or_null_with(
        &mut self,
        output: &mut Output,
        value: Option<&Obj>,
        codec: &Rc<dyn Codec>,
    ) -> Result<()> {
        self.begin_object()?;
        let result = self.write_object_or_null_inner(output, value, codec);
        self.end_object();
        result
    }

    fn write_object_or_null_inner(
        &mut self,
        output: &mut Output,
        value: Option<&Obj>,
        codec: &Rc<dyn Codec>,
    ) -> Result<()> {
        if self.config.references {
            if self.write_reference_or_null(output, value, true)? {
                return Ok(());
            }
        } else if codec.accepts_null() {
            let trace = value.map_or("null", |value| value.type_info().name());
            return codec
                .write_nullable(self, output, value)
                .map_err(|e| e.with_trace(trace));
        } else if value.is_none() {
            output.write_var_int(NULL, true)?;
            return Ok(());
        } else {
            output.write_var_int(NOT_NULL, true)?;
        }

        let Some(value) = value else {
            return Err(TangleError::internal("null value passed the reference check"));
        };
        let info = value.type_info();
        log::trace!("Write: {}", info.name());
        codec
            .write(self, output, value)
            .map_err(|e| e.with_trace(info.name()))
    }

    /// Writes the reference header. Returns true if no payload must follow.
    fn write_reference_or_null(
        &mut self,
        output: &mut Output,
        value: Option<&Obj>,
        may_be_null: bool,
    ) -> Result<bool> {
        let Some(value) = value else {
            log::trace!("Write: null");
            output.write_var_int(NULL, true)?;
            return Ok(true);
        };

        let info = value.type_info();
        if !self.resolver.uses_references(&info) {
            if may_be_null {
                output.write_var_int(NOT_NULL, true)?;
            }
            return Ok(false);
        }

        if let Some(id) = self.resolver.written_id(value) {
            log::trace!("Write reference {id}: {}", info.name());
            output.write_var_int(reference_marker(id)?, true)?;
            return Ok(true);
        }

        let id = self.resolver.add_written(value);
        output.write_var_int(NOT_NULL, true)?;
        log::trace!("Write initial reference {id}: {}", info.name());
        Ok(false)
    }

    // --- Reading ---

    /// Reads a class header and the value that follows, or null.
    pub fn read_class_and_object(&mut self, input: &mut Input) -> Result<Option<Obj>> {
        self.begin_object()?;
        let result = self.read_class_and_object_inner(input);
        self.end_object();
        result
    }

    fn read_class_and_object_inner(&mut self, input: &mut Input) -> Result<Option<Obj>> {
        let Some(registration) = self.registry.read_type(input)? else {
            return Ok(None);
        };
        let info = registration.type_info();
        self.read_payload(input, &info, &registration.codec(), false)
    }

    /// Reads a non-null value of type `info` written by [`Self::write_object`].
    pub fn read_object(&mut self, input: &mut Input, info: &TypeInfo) -> Result<Obj> {
        let registration = self.registry.registration(info)?;
        self.read_object_with(input, info, &registration.codec())
    }

    /// Reads a non-null value of type `info` with `codec`.
    pub fn read_object_with(&mut self, input: &mut Input, info: &TypeInfo, codec: &Rc<dyn Codec>) -> Result<Obj> {
        self.begin_object()?;
        let result = self
            .read_payload(input, info, codec, false)
            .and_then(|value| {
                value.ok_or_else(|| TangleError::format(format!("null where {} was required", info.name())))
            });
        self.end_object();
        result
    }

    /// Reads a non-null value of type `T`.
    pub fn read_object_as<T: Any>(&mut self, input: &mut Input) -> Result<Rc<T>> {
        let value = self.read_object(input, &TypeInfo::of::<T>())?;
        value
            .downcast::<T>()
            .ok_or_else(|| TangleError::mismatch(std::any::type_name::<T>(), value.type_info().name()))
    }

    /// Reads a value of type `info`, or null, written by [`Self::write_object_or_null`].
    pub fn read_object_or_null(&mut self, input: &mut Input, info: &TypeInfo) -> Result<Option<Obj>> {
        let registration = self.registry.registration(info)?;
        self.read_object_or_null_with(input, info, &registration.codec())
    }

    /// Reads a value of type `info`, or null, with `codec`.
    pub fn read_object_or_null_with(
        &mut self,
        input: &mut Input,
        info: &TypeInfo,
        codec: &Rc<dyn Codec>,
    ) -> Result<Option<Obj>> {
        self.begin_object()?;
        let result = self.read_object_or_null_inner(input, info, codec);
        self.end_object();
        result
    }

    fn read_object_or_null_inner(
        &mut self,
        input: &mut Input,
        info: &TypeInfo,
        codec: &Rc<dyn Codec>,
    ) -> Result<Option<Obj>> {
        if self.config.references {
            return self.read_payload(input, info, codec, true);
        }
        if codec.accepts_null() {
            return codec
                .read_nullable(self, input, info)
                .map_err(|e| e.with_trace(info.name()));
        }
        match input.read_var_int(true)? {
            NULL => Ok(None),
            NOT_NULL => codec
                .read(self, input, info)
                .map(Some)
                .map_err(|e| e.with_trace(info.name())),
            marker => Err(TangleError::format(format!("invalid null marker {marker}"))),
        }
    }

    /// Reads the reference header, if references are on, then the payload.
    fn read_payload(
        &mut self,
        input: &mut Input,
        info: &TypeInfo,
        codec: &Rc<dyn Codec>,
        may_be_null: bool,
    ) -> Result<Option<Obj>> {
        if !self.config.references {
            log::trace!("Read: {}", info.name());
            return codec
                .read(self, input, info)
                .map(Some)
                .map_err(|e| e.with_trace(info.name()));
        }
        match self.read_reference_or_null(input, info, may_be_null)? {
            ReadReference::Resolved(value) => Ok(value),
            ReadReference::Pending(stack_size) => {
                log::trace!("Read: {}", info.name());
                let outer = std::mem::replace(&mut self.bind_point, stack_size);
                let value = codec.read(self, input, info);
                self.bind_point = outer;
                let value = value.map_err(|e| e.with_trace(info.name()))?;
                // The codec did not bind the object itself.
                if self.read_reference_ids.len() == stack_size {
                    self.bind_read(&value);
                }
                Ok(Some(value))
            }
        }
    }

    fn read_reference_or_null(
        &mut self,
        input: &mut Input,
        info: &TypeInfo,
        may_be_null: bool,
    ) -> Result<ReadReference> {
        let supported = self.resolver.uses_references(info);
        let marker = if may_be_null {
            let marker = input.read_var_int(true)?;
            if marker == NULL {
                log::trace!("Read object: null");
                return Ok(ReadReference::Resolved(None));
            }
            if !supported {
                if marker != NOT_NULL {
                    return Err(TangleError::format(format!(
                        "invalid null marker {marker} for value type {}",
                        info.name()
                    )));
                }
                self.read_reference_ids.push(None);
                return Ok(ReadReference::Pending(self.read_reference_ids.len()));
            }
            marker
        } else {
            if !supported {
                self.read_reference_ids.push(None);
                return Ok(ReadReference::Pending(self.read_reference_ids.len()));
            }
            input.read_var_int(true)?
        };

        match marker {
            NOT_NULL => {
                let id = self.resolver.next_read_id(info);
                log::trace!("Read initial reference {id}: {}", info.name());
                self.read_reference_ids.push(Some(id));
                Ok(ReadReference::Pending(self.read_reference_ids.len()))
            }
            NULL => Err(TangleError::format(format!(
                "null marker where {} was required",
                info.name()
            ))),
            _ => {
                let id = u32::try_from(marker - 2)
                    .map_err(|_| TangleError::format(format!("invalid reference marker {marker}")))?;
                let value = self.resolver.read_object(info, id)?;
                log::trace!("Read reference {id}: {}", info.name());
                Ok(ReadReference::Resolved(Some(value)))
            }
        }
    }

    /// Binds a freshly created, possibly incomplete, object.
    ///
    /// Codecs of types that can take part in cycles must call this as soon as the
    /// instance exists and before reading or copying any field that might refer
    /// back to it. When reading, the object is bound to the pending reference id;
    /// when copying, it is recorded as the copy of the original being copied.
    ///
    /// A codec binds at most one object per payload. A second call fails.
    pub fn reference(&mut self, object: &Obj) -> Result<()> {
        if self.copy_depth > 0 {
            return match self.pending_copies.last_mut() {
                Some((_, true)) => Err(TangleError::internal(format!(
                    "{} bound twice while copying",
                    object.type_info().name()
                ))),
                Some((original, bound)) => {
                    self.original_to_copy.put(original.clone(), object.clone());
                    *bound = true;
                    Ok(())
                }
                None => Ok(()),
            };
        }
        if !self.config.references {
            return Ok(());
        }
        if self.bind_point == 0 || self.read_reference_ids.len() != self.bind_point {
            return Err(TangleError::internal(format!(
                "{} has no pending reference to bind",
                object.type_info().name()
            )));
        }
        self.bind_read(object);
        Ok(())
    }

    /// Binds `object` to the pending id on top of the stack.
    fn bind_read(&mut self, object: &Obj) {
        if let Some(Some(id)) = self.read_reference_ids.pop() {
            log::trace!("Bind reference {id}: {}", object.type_info().name());
            self.resolver.set_read(id, object.clone());
        }
    }

    // --- Copying ---

    /// Returns a deep copy of `original`.
    ///
    /// With copy references on, an object reachable twice is copied once and
    /// cycles are preserved.
    pub fn copy(&mut self, original: &Obj) -> Result<Obj> {
        if self.copy_shallow {
            return Ok(original.clone());
        }
        self.begin_copy()?;
        let result = self.copy_inner(original);
        self.end_copy();
        result
    }

    /// Returns a copy of `original` whose fields still point at the original children.
    pub fn copy_shallow(&mut self, original: &Obj) -> Result<Obj> {
        self.begin_copy()?;
        self.copy_shallow = true;
        let result = self.copy_inner(original);
        self.copy_shallow = false;
        self.end_copy();
        result
    }

    fn begin_copy(&mut self) -> Result<()> {
        self.copy_depth += 1;
        if let Some(max) = self.config.max_depth
            && self.copy_depth > max
        {
            self.end_copy();
            return Err(ErrorKind::DepthExceeded(max).into());
        }
        Ok(())
    }

    fn end_copy(&mut self) {
        self.copy_depth = self.copy_depth.saturating_sub(1);
        if self.copy_depth == 0 {
            self.clear_copy_state();
        }
    }

    fn copy_inner(&mut self, original: &Obj) -> Result<Obj> {
        let copy_references = self.config.copy_references;
        if copy_references && let Some(existing) = self.original_to_copy.get(original) {
            return Ok(existing.clone());
        }

        let info = original.type_info();
        let codec = self.registry.registration(&info)?.codec();
        if copy_references {
            self.pending_copies.push((original.clone(), false));
        }
        let result = codec
            .copy(self, original)
            .map_err(|e| e.with_trace(info.name()));
        if copy_references
            && let Some((original, bound)) = self.pending_copies.pop()
            && !bound
            && let Ok(copy) = &result
        {
            self.original_to_copy.put(original, copy.clone());
        }
        result
    }
}

/// Reference header for a written id: `id + 2`.
fn reference_marker(id: u32) -> Result<i32> {
    id.checked_add(2)
        .and_then(|marker| i32::try_from(marker).ok())
        .ok_or_else(|| TangleError::internal(format!("reference id {id} out of range")))
}
