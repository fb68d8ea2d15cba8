#![forbid(unsafe_code)]

use std::rc::Rc;

use tether_core::{LifecycleFlags, ObjectRef, Result, Value, WeakObjectRef};

use super::Accessor;

/// Plain get/set access to a property. Never notifies by itself; a write
/// still reaches whatever observer is installed on the property.
pub struct PropertyAccessor {
    object: WeakObjectRef,
    property: Rc<str>,
}

impl PropertyAccessor {
    #[must_use]
    pub fn new(object: &ObjectRef, property: &str) -> Self {
        Self {
            object: object.downgrade(),
            property: Rc::from(property),
        }
    }
}

impl Accessor for PropertyAccessor {
    fn get_value(&self) -> Value {
        self.object
            .upgrade()
            .map(|object| object.get(&self.property))
            .unwrap_or_default()
    }

    fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        match self.object.upgrade() {
            Some(object) => object.write(
                &self.property,
                value,
                flags - LifecycleFlags::UPDATE_SOURCE_EXPRESSION,
            ),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("property", &self.property)
            .finish()
    }
}
