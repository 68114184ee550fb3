use super::{Codable, Codec, expect_ref};
use crate::constants::MAX_PREALLOCATION;
use crate::engine::Tangle;
use crate::error::{Result, TangleError};
use crate::io::{Input, Output};
use crate::object::{Obj, TypeInfo};
use std::any::Any;
use std::rc::Rc;

/// Codec for `Vec<Obj>`.
///
/// Payload: `varint(len)` followed by the elements. When the element type is
/// known, either configured here or pushed as type argument `0` by the parent
/// codec, elements are written with [`Tangle::write_object_or_null`], without a
/// class header, and must all be of that type. Otherwise every element carries
/// its own class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCodec {
    element: Option<TypeInfo>,
}

impl ListCodec {
    /// A codec writing a class header per element.
    pub fn new() -> Self {
        Self { element: None }
    }

    /// A codec for lists whose elements are all `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            element: Some(TypeInfo::of::<T>()),
        }
    }

    fn element(&self, tangle: &Tangle) -> Option<TypeInfo> {
        self.element.or_else(|| tangle.resolve_generic(0))
    }
}

impl Codec for ListCodec {
    fn write(&self, tangle: &mut Tangle, output: &mut Output, value: &Obj) -> Result<()> {
        let list = expect_ref::<Vec<Obj>>(value)?;
        output.write_length(list.len())?;
        match self.element(tangle) {
            Some(element) => {
                for item in list {
                    if item.type_info() != element {
                        return Err(TangleError::mismatch(element.name(), item.type_info().name()));
                    }
                    tangle.write_object_or_null(output, Some(item), &element)?;
                }
            }
            None => {
                for item in list {
                    tangle.write_class_and_object(output, Some(item))?;
                }
            }
        }
        Ok(())
    }

    fn read(&self, tangle: &mut Tangle, input: &mut Input, _info: &TypeInfo) -> Result<Obj> {
        let len = input.read_length()?;
        let mut list = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        match self.element(tangle) {
            Some(element) => {
                for index in 0..len {
                    let item = tangle
                        .read_object_or_null(input, &element)?
                        .ok_or_else(|| TangleError::format(format!("null list element at {index}")))?;
                    list.push(item);
                }
            }
            None => {
                for index in 0..len {
                    let item = tangle
                        .read_class_and_object(input)?
                        .ok_or_else(|| TangleError::format(format!("null list element at {index}")))?;
                    list.push(item);
                }
            }
        }
        Ok(Obj::new(list))
    }

    fn copy(&self, tangle: &mut Tangle, original: &Obj) -> Result<Obj> {
        let list = expect_ref::<Vec<Obj>>(original)?;
        let copy = list
            .iter()
            .map(|item| tangle.copy(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Obj::new(copy))
    }
}

impl Codable for Vec<Obj> {
    fn codec() -> Rc<dyn Codec> {
        Rc::new(ListCodec::new())
    }
}
