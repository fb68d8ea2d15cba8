#![forbid(unsafe_code)]

//! Property observation: accessors, observers and the locator producing them.
//!
//! - [`Accessor`]: get/set only, no change notification.
//! - [`PropertyObserver`]: an accessor that also accepts [`Subscriber`]s.
//! - [`ObserverLocator`]: hands out the accessor or observer for an
//!   `(object, property)` pair.
//!
//! The reference [`DefaultObserverLocator`] installs a [`SetterObserver`] on
//! plain objects and an [`ElementObserver`] on elements. Both keep their
//! subscribers weakly, so an observer never keeps a binding alive.

mod accessor;
mod element;
mod locator;
mod setter;
mod subscribers;

use std::rc::Rc;

use tether_core::{LifecycleFlags, ObjectRef, Result, Value};

pub use accessor::PropertyAccessor;
pub use element::ElementObserver;
pub use locator::DefaultObserverLocator;
pub use setter::SetterObserver;
pub use subscribers::SubscriberCollection;

/// Receives change notifications from an observer.
pub trait Subscriber {
    fn handle_change(
        &self,
        new_value: &Value,
        old_value: &Value,
        flags: LifecycleFlags,
    ) -> Result<()>;
}

/// Get/set access to one property of one object.
pub trait Accessor {
    fn get_value(&self) -> Value;

    fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()>;

    /// A binding starts using this accessor.
    fn bind(&self, _flags: LifecycleFlags) {}

    /// A binding stops using this accessor.
    fn unbind(&self, _flags: LifecycleFlags) {}
}

/// An accessor whose changes can be subscribed to.
///
/// Subscribing the same subscriber twice registers it once; unsubscribing
/// compares by identity.
pub trait PropertyObserver: Accessor {
    fn subscribe(&self, subscriber: Rc<dyn Subscriber>);

    /// Returns `false` if `subscriber` was not registered.
    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) -> bool;

    fn subscriber_count(&self) -> usize;
}

/// Produces accessors and observers for arbitrary objects.
pub trait ObserverLocator {
    fn get_observer(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn PropertyObserver>;

    fn get_accessor(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn Accessor>;
}

/// What a binding writes its target through.
#[derive(Clone)]
pub enum TargetObserver {
    Accessor(Rc<dyn Accessor>),
    Observer(Rc<dyn PropertyObserver>),
}

impl TargetObserver {
    #[must_use]
    pub fn get_value(&self) -> Value {
        match self {
            Self::Accessor(accessor) => accessor.get_value(),
            Self::Observer(observer) => observer.get_value(),
        }
    }

    pub fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        match self {
            Self::Accessor(accessor) => accessor.set_value(value, flags),
            Self::Observer(observer) => observer.set_value(value, flags),
        }
    }

    pub fn bind(&self, flags: LifecycleFlags) {
        match self {
            Self::Accessor(accessor) => accessor.bind(flags),
            Self::Observer(observer) => observer.bind(flags),
        }
    }

    pub fn unbind(&self, flags: LifecycleFlags) {
        match self {
            Self::Accessor(accessor) => accessor.unbind(flags),
            Self::Observer(observer) => observer.unbind(flags),
        }
    }

    /// The subscribable observer, if this target has one.
    #[must_use]
    pub fn as_observer(&self) -> Option<&Rc<dyn PropertyObserver>> {
        match self {
            Self::Accessor(_) => None,
            Self::Observer(observer) => Some(observer),
        }
    }
}

impl std::fmt::Debug for TargetObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accessor(_) => f.write_str("TargetObserver::Accessor"),
            Self::Observer(observer) => f
                .debug_struct("TargetObserver::Observer")
                .field("subscribers", &observer.subscriber_count())
                .finish(),
        }
    }
}
