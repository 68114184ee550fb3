//! The per-type codec contract and the built-in codec variants.
//!
//! A [`Codec`] turns one value into payload bytes and back. It never writes the
//! class or reference headers; the engine does that before dispatching. Nested
//! values go back through the engine ([`Tangle::write_object`],
//! [`Tangle::read_class_and_object`], ...) so sharing and cycles are tracked for
//! them too.
//!
//! Built-in variants:
//!
//! - [`ValueCodec`]: leaf values encoded through [`crate::rt::Field`].
//! - [`ListCodec`]: `Vec<Obj>`, with an optional known element type.
//! - [`StructuralCodec`]: field-by-field codec for types deriving [`crate::Structural`].
//! - [`SerdeCodec`]: any serde type, as a length-prefixed bincode payload.

mod list;
mod serde_codec;
mod structural;
mod value;

pub use list::ListCodec;
pub use serde_codec::SerdeCodec;
pub use structural::{Structural, StructuralCodec};
pub use value::ValueCodec;

use crate::engine::Tangle;
use crate::error::{ErrorKind, Result, TangleError};
use crate::instantiator::Instantiator;
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use std::any::Any;
use std::rc::Rc;

/// Reads and writes the payload of one type.
pub trait Codec {
    /// Writes the payload of `value`.
    fn write(&self, tangle: &mut Tangle, output: &mut Output, value: &Obj) -> Result<()>;

    /// Reads a payload and returns the value it describes.
    fn read(&self, tangle: &mut Tangle, input: &mut Input, info: &TypeInfo) -> Result<Obj>;

    /// Whether the codec encodes null itself.
    ///
    /// Only consulted when references are disabled. If false, the engine writes a
    /// null marker and the codec never sees null.
    fn accepts_null(&self) -> bool {
        false
    }

    /// Writes a value that may be null. Only called when [`Self::accepts_null`] is true.
    fn write_nullable(
        &self,
        tangle: &mut Tangle,
        output: &mut Output,
        value: Option<&Obj>,
    ) -> Result<()> {
        match value {
            Some(value) => self.write(tangle, output, value),
            None => Err(TangleError::internal("codec does not accept null")),
        }
    }

    /// Reads a value that may be null. Only called when [`Self::accepts_null`] is true.
    fn read_nullable(
        &self,
        tangle: &mut Tangle,
        input: &mut Input,
        info: &TypeInfo,
    ) -> Result<Option<Obj>> {
        self.read(tangle, input, info).map(Some)
    }

    /// Immutable values are shared instead of copied.
    fn is_immutable(&self) -> bool {
        false
    }

    /// Creates a deep copy of `original`. Nested values must be copied through
    /// [`Tangle::copy`].
    fn copy(&self, tangle: &mut Tangle, original: &Obj) -> Result<Obj> {
        let _ = tangle;
        if self.is_immutable() {
            Ok(original.clone())
        } else {
            Err(ErrorKind::UnsupportedCopy(original.type_info().name().to_string()).into())
        }
    }

    /// Instantiator for `info`, used by the default instantiator strategy.
    fn new_instantiator(&self, info: &TypeInfo) -> Option<Rc<dyn Instantiator>> {
        let _ = info;
        None
    }
}

/// Types that know which codec handles them when registered without an explicit one.
///
/// Implemented for the primitive value types, `String`, `Vec<Obj>` and every type
/// deriving [`crate::Structural`].
pub trait Codable: Any {
    /// A fresh codec for `Self`.
    fn codec() -> Rc<dyn Codec>;
}

/// Borrows the value inside `obj` as `T`, or fails naming both types.
pub fn expect_ref<T: Any>(obj: &Obj) -> Result<&T> {
    obj.downcast_ref::<T>()
        .ok_or_else(|| TangleError::mismatch(std::any::type_name::<T>(), obj.type_info().name()))
}
