use super::{Codec, expect_ref};
use crate::engine::Tangle;
use crate::error::{Result, TangleError};
use crate::instantiator::{FnInstantiator, Instantiator};
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Field-by-field encoding of a struct. Usually derived with
/// `#[derive(Structural)]`.
///
/// Two read modes exist:
///
/// - By default every field is read first and the value is built from them.
///   Such a type cannot be reached again from its own fields while it is being read.
/// - With `CYCLIC = true` (`#[tangle(cyclic)]`) an empty instance is created
///   through the instantiator and bound with [`Tangle::reference`] before any
///   field is read. Fields are then filled in place, so they must use interior
///   mutability (`RefCell`, `Cell`).
pub trait Structural: Any + Sized {
    /// Whether the type is read in place.
    const CYCLIC: bool = false;

    /// Writes every field in declaration order.
    fn write_fields(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()>;

    /// Reads every field and builds the value.
    fn read_fields(tangle: &mut Tangle, input: &mut Input) -> Result<Self>;

    /// Copies every field and builds the copy.
    fn copy_fields(&self, tangle: &mut Tangle) -> Result<Self>;

    /// An empty instance for in-place reading.
    fn instantiate() -> Option<Self> {
        None
    }

    /// Reads every field into `self`.
    fn read_into(&self, tangle: &mut Tangle, input: &mut Input) -> Result<()> {
        let _ = (tangle, input);
        Err(TangleError::internal(format!(
            "{} cannot be read in place",
            std::any::type_name::<Self>()
        )))
    }

    /// Copies every field of `source` into `self`.
    fn copy_into(&self, source: &Self, tangle: &mut Tangle) -> Result<()> {
        let _ = (source, tangle);
        Err(TangleError::internal(format!(
            "{} cannot be copied in place",
            std::any::type_name::<Self>()
        )))
    }
}

/// Codec for [`Structural`] types.
pub struct StructuralCodec<T>(PhantomData<fn() -> T>);

impl<T> StructuralCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for StructuralCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StructuralCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructuralCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: Structural> Codec for StructuralCodec<T> {
    fn write(&self, tangle: &mut Tangle, output: &mut Output, value: &Obj) -> Result<()> {
        expect_ref::<T>(value)?.write_fields(tangle, output)
    }

    fn read(&self, tangle: &mut Tangle, input: &mut Input, info: &TypeInfo) -> Result<Obj> {
        if !T::CYCLIC {
            return T::read_fields(tangle, input).map(Obj::new);
        }
        let object = tangle.new_instance(info)?;
        tangle.reference(&object)?;
        expect_ref::<T>(&object)?.read_into(tangle, input)?;
        Ok(object)
    }

    fn copy(&self, tangle: &mut Tangle, original: &Obj) -> Result<Obj> {
        let source = expect_ref::<T>(original)?;
        if !T::CYCLIC {
            return source.copy_fields(tangle).map(Obj::new);
        }
        let copy = tangle.new_instance(&original.type_info())?;
        tangle.reference(&copy)?;
        expect_ref::<T>(&copy)?.copy_into(source, tangle)?;
        Ok(copy)
    }

    fn new_instantiator(&self, _info: &TypeInfo) -> Option<Rc<dyn Instantiator>> {
        Some(Rc::new(FnInstantiator::new(T::instantiate)))
    }
}
