//! Type-erased object handles.
//!
//! A live object is an [`Obj`]: a reference-counted `dyn Any` plus the
//! [`TypeInfo`] of the concrete value. Cloning an `Obj` clones the handle, not the
//! value, and two handles are the same object exactly when they share an
//! allocation. Graph edges inside user types are `Rc<T>` or `Obj` fields; mutable
//! and cyclic graphs use `RefCell`/`Cell` inside the pointee.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Runtime descriptor of a concrete Rust type.
///
/// Equality and hashing use the [`TypeId`] only; [`TypeInfo::name`] is the fully
/// qualified name transmitted on the wire for types resolved by name.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Descriptor of `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, as reported by [`std::any::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this describes `T`.
    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A shared, type-erased handle to a live object.
#[derive(Clone)]
pub struct Obj {
    value: Rc<dyn Any>,
    info: TypeInfo,
}

impl Obj {
    /// Moves `value` into a new allocation.
    pub fn new<T: Any>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    /// Wraps an existing allocation. The handle aliases `rc`.
    pub fn from_rc<T: Any>(rc: Rc<T>) -> Self {
        Self {
            value: rc,
            info: TypeInfo::of::<T>(),
        }
    }

    /// Descriptor of the concrete type.
    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// Returns true if the concrete type is `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.info.is::<T>()
    }

    /// Borrows the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    /// Returns a typed handle sharing this allocation.
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    /// Address of the allocation, the object's identity.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.value) as *const () as usize
    }

    /// Returns true if both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Obj) -> bool {
        self.addr() == other.addr()
    }

    /// Number of strong handles to the allocation.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.value)
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj<{}>@{:#x}", self.info.name, self.addr())
    }
}

impl<T: Any> From<Rc<T>> for Obj {
    fn from(rc: Rc<T>) -> Self {
        Self::from_rc(rc)
    }
}
