use crate::codec::Codec;
use crate::instantiator::Instantiator;
use crate::object::TypeInfo;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Binds a runtime type to its codec and wire id.
///
/// One registration exists per registered type. It is shared by the id table and
/// the type table, so replacing the codec in place is seen by both.
pub struct Registration {
    info: TypeInfo,
    id: Option<u32>,
    codec: RefCell<Rc<dyn Codec>>,
    instantiator: RefCell<Option<Rc<dyn Instantiator>>>,
}

impl Registration {
    /// Creates a registration. `id == None` means the type is written by name.
    pub fn new(info: TypeInfo, codec: Rc<dyn Codec>, id: Option<u32>) -> Self {
        Self {
            info,
            id,
            codec: RefCell::new(codec),
            instantiator: RefCell::new(None),
        }
    }

    /// The registered type.
    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// The wire id, or `None` for types written by name.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Returns true if the type is written by name.
    pub fn is_by_name(&self) -> bool {
        self.id.is_none()
    }

    /// The current codec.
    pub fn codec(&self) -> Rc<dyn Codec> {
        Rc::clone(&self.codec.borrow())
    }

    /// Replaces the codec.
    pub fn set_codec(&self, codec: Rc<dyn Codec>) {
        *self.codec.borrow_mut() = codec;
    }

    /// The instantiator, if one was set or created.
    pub fn instantiator(&self) -> Option<Rc<dyn Instantiator>> {
        self.instantiator.borrow().clone()
    }

    /// Replaces the instantiator.
    pub fn set_instantiator(&self, instantiator: Rc<dyn Instantiator>) {
        *self.instantiator.borrow_mut() = Some(instantiator);
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "[{id}, {}]", self.info.name()),
            None => write!(f, "[name, {}]", self.info.name()),
        }
    }
}
