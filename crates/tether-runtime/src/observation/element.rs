#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

use tether_core::{LifecycleFlags, ObjectRef, PropertyNotifier, Result, Value, WeakObjectRef};

use super::{Accessor, PropertyObserver, Subscriber, SubscriberCollection};

/// Observer for a property of a view element.
///
/// Models an element property that only reports user edits: writes made by a
/// binding (or any other code) are applied silently, while
/// [`ObjectRef::dispatch_input`] is broadcast with `UPDATE_SOURCE_EXPRESSION`.
/// Input is only listened to while at least one binding has called
/// [`Accessor::bind`].
pub struct ElementObserver {
    object: WeakObjectRef,
    property: Rc<str>,
    subscribers: SubscriberCollection,
    listeners: Cell<u32>,
}

impl ElementObserver {
    /// The observer installed on `element.property`, installing one if needed.
    pub fn for_property(element: &ObjectRef, property: &str) -> Rc<Self> {
        element.observer_or_install(property, || {
            Rc::new(Self {
                object: element.downgrade(),
                property: Rc::from(property),
                subscribers: SubscriberCollection::new(),
                listeners: Cell::new(0),
            })
        })
    }

    /// Whether input events are currently listened to.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listeners.get() > 0
    }
}

impl Accessor for ElementObserver {
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

    fn bind(&self, _flags: LifecycleFlags) {
        self.listeners.set(self.listeners.get() + 1);
    }

    fn unbind(&self, _flags: LifecycleFlags) {
        self.listeners.set(self.listeners.get().saturating_sub(1));
    }
}

impl PropertyObserver for ElementObserver {
    fn subscribe(&self, subscriber: Rc<dyn Subscriber>) {
        self.subscribers.add(subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        self.subscribers.remove(subscriber)
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl PropertyNotifier for ElementObserver {
    fn notify(&self, new_value: &Value, old_value: &Value, flags: LifecycleFlags) -> Result<()> {
        if !flags.contains(LifecycleFlags::UPDATE_SOURCE_EXPRESSION) {
            return Ok(());
        }
        if !self.is_listening() {
            tracing::trace!(
                property = %self.property,
                "input ignored, no binding is listening"
            );
            return Ok(());
        }
        let flags = flags.with_direction(LifecycleFlags::UPDATE_SOURCE_EXPRESSION);
        self.subscribers.notify(new_value, old_value, flags)
    }
}

impl std::fmt::Debug for ElementObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementObserver")
            .field("property", &self.property)
            .field("subscribers", &self.subscribers.len())
            .field("listeners", &self.listeners.get())
            .finish()
    }
}
