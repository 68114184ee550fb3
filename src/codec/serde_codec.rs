use super::{Codec, expect_ref};
use crate::engine::Tangle;
use crate::error::Result;
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// Codec for any serde type: `varint(len)` followed by a bincode payload.
///
/// The payload is opaque to the engine, so objects nested inside it are not
/// reference-tracked.
pub struct SerdeCodec<T>(PhantomData<fn() -> T>);

impl<T> SerdeCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerdeCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T> Codec for SerdeCodec<T>
where
    T: Serialize + DeserializeOwned + Clone + Any,
{
    fn write(&self, _tangle: &mut Tangle, output: &mut Output, value: &Obj) -> Result<()> {
        let value = expect_ref::<T>(value)?;
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
        output.write_length(bytes.len())?;
        output.write_bytes(&bytes)
    }

    fn read(&self, _tangle: &mut Tangle, input: &mut Input, _info: &TypeInfo) -> Result<Obj> {
        let len = input.read_length()?;
        let bytes = input.read_bytes(len)?;
        let (value, _): (T, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(Obj::new(value))
    }

    fn copy(&self, _tangle: &mut Tangle, original: &Obj) -> Result<Obj> {
        Ok(Obj::new(expect_ref::<T>(original)?.clone()))
    }
}
