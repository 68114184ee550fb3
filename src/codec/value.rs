use super::{Codable, Codec, expect_ref};
use crate::engine::Tangle;
use crate::error::Result;
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use crate::rt::Field;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Codec for leaf values, encoded through their [`Field`] implementation.
///
/// Values are treated as immutable: copying returns the same object.
pub struct ValueCodec<T>(PhantomData<fn() -> T>);

impl<T> ValueCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ValueCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ValueCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: Field + Any> Codec for ValueCodec<T> {
    fn write(&self, tangle: &mut Tangle, output: &mut Output, value: &Obj) -> Result<()> {
        expect_ref::<T>(value)?.write_field(tangle, output)
    }

    fn read(&self, tangle: &mut Tangle, input: &mut Input, _info: &TypeInfo) -> Result<Obj> {
        T::read_field(tangle, input).map(Obj::new)
    }

    fn is_immutable(&self) -> bool {
        true
    }
}

macro_rules! codable_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Codable for $ty {
                fn codec() -> Rc<dyn Codec> {
                    Rc::new(ValueCodec::<$ty>::new())
                }
            }
        )*
    };
}

codable_values!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, (),
);
