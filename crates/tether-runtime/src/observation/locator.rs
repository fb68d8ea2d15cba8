#![forbid(unsafe_code)]

use std::rc::Rc;

use tether_core::{LifecycleFlags, ObjectRef};

use super::{
    Accessor, ElementObserver, ObserverLocator, PropertyAccessor, PropertyObserver,
    SetterObserver,
};

/// Observer locator for [`ObjectRef`] graphs.
///
/// Observers are cached on the object itself, so asking twice for the same
/// `(object, property)` returns the same observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObserverLocator;

impl DefaultObserverLocator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ObserverLocator for DefaultObserverLocator {
    fn get_observer(
        &self,
        _flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn PropertyObserver> {
        if object.is_element() {
            ElementObserver::for_property(object, property) as Rc<dyn PropertyObserver>
        } else {
            SetterObserver::for_property(object, property) as Rc<dyn PropertyObserver>
        }
    }

    fn get_accessor(
        &self,
        _flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn Accessor> {
        Rc::new(PropertyAccessor::new(object, property))
    }
}
