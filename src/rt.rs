//! Runtime support for `#[derive(Structural)]` and hand-written codecs.
//!
//! [`Field`] is the per-field encoding used by [`crate::codec::StructuralCodec`]
//! and [`crate::codec::ValueCodec`]:
//!
//! | Type | Encoding |
//! |---|---|
//! | `i8`, `u8` | one byte |
//! | other signed integers | zigzag varint |
//! | other unsigned integers | varint |
//! | `f32`, `f64` | fixed width, little-endian |
//! | `bool` | one byte |
//! | `char` | varint of the scalar value |
//! | `String` | string framing |
//! | `Option<T>` | presence byte, or the null form of `T` where it has one |
//! | `Vec<T>`, `Box<T>` | length + elements / `T` |
//! | `Rc<T>`, `Obj` | class header + reference header + payload, through the engine |
//! | `RefCell<T>`, `Cell<T>` | `T` |

use crate::engine::Tangle;
use crate::error::{Result, TangleError};
use crate::io::{Input, Output};
use crate::object::Obj;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Encoding of one struct field.
pub trait Field: Sized {
    /// Writes the value.
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()>;

    /// Reads a value.
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self>;

    /// Deep-copies the value. Graph edges are copied through [`Tangle::copy`].
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self>;

    /// Writes an optional value. Defaults to a presence byte.
    fn write_optional(value: Option<&Self>, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        match value {
            Some(value) => {
                output.write_boolean(true)?;
                value.write_field(tangle, output)
            }
            None => output.write_boolean(false),
        }
    }

    /// Reads an optional value written by [`Self::write_optional`].
    fn read_optional(tangle: &mut Tangle, input: &mut Input) -> Result<Option<Self>> {
        if input.read_boolean()? {
            Self::read_field(tangle, input).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// In-place reading and copying of a field of a cyclic type.
pub trait FieldSlot {
    /// Reads a value and stores it in the slot.
    fn read_into(&self, tangle: &mut Tangle, input: &mut Input) -> Result<()>;

    /// Copies the value of `source` into the slot.
    fn copy_into(&self, source: &Self, tangle: &mut Tangle) -> Result<()>;
}

// --- Primitives ---

impl Field for i8 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_byte(*self as u8)
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        Ok(input.read_byte()? as i8)
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for u8 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_byte(*self)
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        input.read_byte()
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

macro_rules! varint_field {
    ($ty:ty, $write:ident, $read:ident, $wire:ty, $optimize_positive:expr) => {
        impl Field for $ty {
            fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
                output.$write(*self as $wire, $optimize_positive).map(|_| ())
            }
            fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
                let wire = input.$read($optimize_positive)?;
                <$ty>::try_from(wire).map_err(|_| {
                    TangleError::format(format!(
                        "{} out of range for {}",
                        wire,
                        stringify!($ty)
                    ))
                })
            }
            fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
                Ok(*self)
            }
        }
    };
}

varint_field!(i16, write_var_int, read_var_int, i32, false);
varint_field!(i32, write_var_int, read_var_int, i32, false);
varint_field!(i64, write_var_long, read_var_long, i64, false);
varint_field!(isize, write_var_long, read_var_long, i64, false);
varint_field!(u16, write_var_int, read_var_int, i32, true);

impl Field for u32 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_var_int(*self as i32, true).map(|_| ())
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        Ok(input.read_var_int(true)? as u32)
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for u64 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_var_long(*self as i64, true).map(|_| ())
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        Ok(input.read_var_long(true)? as u64)
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for usize {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_var_long(*self as i64, true).map(|_| ())
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        let wire = input.read_var_long(true)? as u64;
        usize::try_from(wire)
            .map_err(|_| TangleError::format(format!("{wire} out of range for usize")))
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for f32 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_float(*self)
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        input.read_float()
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for f64 {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_double(*self)
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        input.read_double()
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for bool {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_boolean(*self)
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        input.read_boolean()
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for char {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_var_int(*self as u32 as i32, true).map(|_| ())
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        let code = input.read_var_int(true)? as u32;
        char::from_u32(code)
            .ok_or_else(|| TangleError::format(format!("invalid char U+{code:04X}")))
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(*self)
    }
}

impl Field for () {
    fn write_field(&self, _: &mut Tangle, _: &mut Output) -> Result<()> {
        Ok(())
    }
    fn read_field(_: &mut Tangle, _: &mut Input) -> Result<Self> {
        Ok(())
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(())
    }
}

impl Field for String {
    fn write_field(&self, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_string(Some(self))
    }
    fn read_field(_: &mut Tangle, input: &mut Input) -> Result<Self> {
        input
            .read_string()?
            .ok_or_else(|| TangleError::format("null where a String was required"))
    }
    fn copy_field(&self, _: &mut Tangle) -> Result<Self> {
        Ok(self.clone())
    }
    fn write_optional(value: Option<&Self>, _: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_string(value.map(String::as_str))
    }
    fn read_optional(_: &mut Tangle, input: &mut Input) -> Result<Option<Self>> {
        input.read_string()
    }
}

// --- Containers ---

impl<T: Field> Field for Option<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        T::write_optional(self.as_ref(), tangle, output)
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        T::read_optional(tangle, input)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        self.as_ref().map(|value| value.copy_field(tangle)).transpose()
    }
}

impl<T: Field> Field for Vec<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        output.write_length(self.len())?;
        for item in self {
            item.write_field(tangle, output)?;
        }
        Ok(())
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        let len = input.read_length()?;
        let mut items = Vec::with_capacity(len.min(crate::constants::MAX_PREALLOCATION));
        for _ in 0..len {
            items.push(T::read_field(tangle, input)?);
        }
        Ok(items)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        self.iter().map(|item| item.copy_field(tangle)).collect()
    }
}

impl<T: Field> Field for Box<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        (**self).write_field(tangle, output)
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        T::read_field(tangle, input).map(Box::new)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        (**self).copy_field(tangle).map(Box::new)
    }
}

// --- Graph edges ---

impl Field for Obj {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        tangle.write_class_and_object(output, Some(self))
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        tangle
            .read_class_and_object(input)?
            .ok_or_else(|| TangleError::format("null where an object was required"))
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        tangle.copy(self)
    }
    fn write_optional(value: Option<&Self>, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        tangle.write_class_and_object(output, value)
    }
    fn read_optional(tangle: &mut Tangle, input: &mut Input) -> Result<Option<Self>> {
        tangle.read_class_and_object(input)
    }
}

fn downcast_edge<T: Any>(object: Obj) -> Result<Rc<T>> {
    object
        .downcast::<T>()
        .ok_or_else(|| TangleError::mismatch(std::any::type_name::<T>(), object.type_info().name()))
}

impl<T: Any> Field for Rc<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        tangle.write_class_and_object(output, Some(&Obj::from_rc(Rc::clone(self))))
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        downcast_edge(Obj::read_field(tangle, input)?)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        downcast_edge(tangle.copy(&Obj::from_rc(Rc::clone(self)))?)
    }
    fn write_optional(value: Option<&Self>, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        let object = value.map(|rc| Obj::from_rc(Rc::clone(rc)));
        tangle.write_class_and_object(output, object.as_ref())
    }
    fn read_optional(tangle: &mut Tangle, input: &mut Input) -> Result<Option<Self>> {
        tangle
            .read_class_and_object(input)?
            .map(downcast_edge)
            .transpose()
    }
}

// --- Interior mutability ---

impl<T: Field> Field for RefCell<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        self.try_borrow()
            .map_err(|_| TangleError::internal("field is mutably borrowed"))?
            .write_field(tangle, output)
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        T::read_field(tangle, input).map(RefCell::new)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        self.try_borrow()
            .map_err(|_| TangleError::internal("field is mutably borrowed"))?
            .copy_field(tangle)
            .map(RefCell::new)
    }
}

impl<T: Field + Copy> Field for Cell<T> {
    fn write_field(&self, tangle: &mut Tangle, output: &mut Output) -> Result<()> {
        self.get().write_field(tangle, output)
    }
    fn read_field(tangle: &mut Tangle, input: &mut Input) -> Result<Self> {
        T::read_field(tangle, input).map(Cell::new)
    }
    fn copy_field(&self, tangle: &mut Tangle) -> Result<Self> {
        self.get().copy_field(tangle).map(Cell::new)
    }
}

impl<T: Field> FieldSlot for RefCell<T> {
    fn read_into(&self, tangle: &mut Tangle, input: &mut Input) -> Result<()> {
        let value = T::read_field(tangle, input)?;
        *self
            .try_borrow_mut()
            .map_err(|_| TangleError::internal("field is already borrowed"))? = value;
        Ok(())
    }

    fn copy_into(&self, source: &Self, tangle: &mut Tangle) -> Result<()> {
        let value = source
            .try_borrow()
            .map_err(|_| TangleError::internal("field is mutably borrowed"))?
            .copy_field(tangle)?;
        *self
            .try_borrow_mut()
            .map_err(|_| TangleError::internal("field is already borrowed"))? = value;
        Ok(())
    }
}

impl<T: Field + Copy> FieldSlot for Cell<T> {
    fn read_into(&self, tangle: &mut Tangle, input: &mut Input) -> Result<()> {
        self.set(T::read_field(tangle, input)?);
        Ok(())
    }

    fn copy_into(&self, source: &Self, tangle: &mut Tangle) -> Result<()> {
        self.set(source.get().copy_field(tangle)?);
        Ok(())
    }
}
