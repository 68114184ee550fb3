//! Creating instances without running a codec's read logic.
//!
//! Codecs for cyclic types need an instance to bind with [`crate::Tangle::reference`]
//! before their fields are read. They ask [`crate::Tangle::new_instance`], which uses
//! the registration's instantiator, creating it on first use through the engine's
//! [`InstantiatorStrategy`].

use crate::codec::Codec;
use crate::error::{ErrorKind, Result};
use crate::object::{Obj, TypeInfo};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Creates fresh instances of one type.
pub trait Instantiator {
    /// Creates a new instance of `info`.
    fn create(&self, info: &TypeInfo) -> Result<Obj>;
}

/// Chooses an [`Instantiator`] for a type the first time one is needed.
pub trait InstantiatorStrategy {
    /// Returns an instantiator for `info`, whose registered codec is `codec`.
    fn new_instantiator(&self, info: &TypeInfo, codec: &dyn Codec) -> Result<Rc<dyn Instantiator>>;
}

/// Asks the codec for an instantiator and fails if it has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInstantiatorStrategy;

impl InstantiatorStrategy for DefaultInstantiatorStrategy {
    fn new_instantiator(&self, info: &TypeInfo, codec: &dyn Codec) -> Result<Rc<dyn Instantiator>> {
        codec.new_instantiator(info).ok_or_else(|| {
            ErrorKind::Construction {
                type_name: info.name().to_string(),
                reason: "class has no instantiator (missing no-arg constructor)".to_string(),
            }
            .into()
        })
    }
}

/// Instantiates through [`Default`].
pub struct DefaultInstantiator<T>(PhantomData<fn() -> T>);

impl<T> DefaultInstantiator<T> {
    /// Creates the instantiator.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DefaultInstantiator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DefaultInstantiator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultInstantiator<{}>", std::any::type_name::<T>())
    }
}

impl<T: Any + Default> Instantiator for DefaultInstantiator<T> {
    fn create(&self, _info: &TypeInfo) -> Result<Obj> {
        Ok(Obj::new(T::default()))
    }
}

/// Instantiates through a closure. `None` from the closure is a construction fault.
pub struct FnInstantiator<T, F> {
    factory: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnInstantiator<T, F>
where
    F: Fn() -> Option<T>,
{
    /// Wraps `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _marker: PhantomData,
        }
    }
}

impl<T: Any, F: Fn() -> Option<T>> Instantiator for FnInstantiator<T, F> {
    fn create(&self, info: &TypeInfo) -> Result<Obj> {
        (self.factory)().map(Obj::new).ok_or_else(|| {
            ErrorKind::Construction {
                type_name: info.name().to_string(),
                reason: "instantiator returned no instance".to_string(),
            }
            .into()
        })
    }
}
