#![forbid(unsafe_code)]

use std::rc::Rc;

use tether_core::{LifecycleFlags, ObjectRef, PropertyNotifier, Result, Value, WeakObjectRef};

use super::{Accessor, PropertyObserver, Subscriber, SubscriberCollection};

/// Observer for a property of a plain (view-model) object.
///
/// Every change is re-broadcast with `UPDATE_TARGET_INSTANCE`, whatever
/// direction the write carried: a view-model write always flows toward the
/// view, including writes made by a from-view binding.
pub struct SetterObserver {
    object: WeakObjectRef,
    property: Rc<str>,
    subscribers: SubscriberCollection,
}

impl SetterObserver {
    /// The observer installed on `object.property`, installing one if needed.
    pub fn for_property(object: &ObjectRef, property: &str) -> Rc<Self> {
        object.observer_or_install(property, || {
            Rc::new(Self {
                object: object.downgrade(),
                property: Rc::from(property),
                subscribers: SubscriberCollection::new(),
            })
        })
    }

    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }
}

impl Accessor for SetterObserver {
    fn get_value(&self) -> Value {
        self.object
            .upgrade()
            .map(|object| object.get(&self.property))
            .unwrap_or_default()
    }

    fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        match self.object.upgrade() {
            Some(object) => object.write(&self.property, value, flags),
            None => Ok(()),
        }
    }
}

impl PropertyObserver for SetterObserver {
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

impl PropertyNotifier for SetterObserver {
    fn notify(&self, new_value: &Value, old_value: &Value, flags: LifecycleFlags) -> Result<()> {
        let flags = flags.with_direction(LifecycleFlags::UPDATE_TARGET_INSTANCE);
        self.subscribers.notify(new_value, old_value, flags)
    }
}

impl std::fmt::Debug for SetterObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetterObserver")
            .field("property", &self.property)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Log {
        changes: RefCell<Vec<(Value, Value, LifecycleFlags)>>,
    }

    impl Subscriber for Log {
        fn handle_change(&self, new: &Value, old: &Value, flags: LifecycleFlags) -> Result<()> {
            self.changes
                .borrow_mut()
                .push((new.clone(), old.clone(), flags));
            Ok(())
        }
    }

    #[test]
    fn direct_writes_are_observed() {
        let user = ObjectRef::new().with("name", "Ann");
        let observer = SetterObserver::for_property(&user, "name");
        let log = Rc::new(Log::default());
        observer.subscribe(log.clone());

        user.set("name", "Bea").unwrap();
        let changes = log.changes.borrow();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, Value::from("Bea"));
        assert_eq!(changes[0].1, Value::from("Ann"));
    }

    #[test]
    fn source_writes_are_rebroadcast_target_ward() {
        let vm = ObjectRef::new();
        let observer = SetterObserver::for_property(&vm, "query");
        let log = Rc::new(Log::default());
        observer.subscribe(log.clone());

        observer
            .set_value(
                Value::from("abc"),
                LifecycleFlags::UPDATE_SOURCE_EXPRESSION | LifecycleFlags::MUST_EVALUATE,
            )
            .unwrap();

        let flags = log.changes.borrow()[0].2;
        assert!(flags.contains(LifecycleFlags::UPDATE_TARGET_INSTANCE));
        assert!(!flags.contains(LifecycleFlags::UPDATE_SOURCE_EXPRESSION));
        assert!(flags.contains(LifecycleFlags::MUST_EVALUATE));
    }

    #[test]
    fn identity_is_object_and_property() {
        let vm = ObjectRef::new();
        let a = SetterObserver::for_property(&vm, "x");
        let b = SetterObserver::for_property(&vm, "x");
        let c = SetterObserver::for_property(&vm, "y");
        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let vm = ObjectRef::new();
        let observer = SetterObserver::for_property(&vm, "x");
        let log = Rc::new(Log::default());
        let as_dyn: Rc<dyn Subscriber> = log.clone();
        observer.subscribe(Rc::clone(&as_dyn));
        assert!(observer.unsubscribe(&as_dyn));
        assert!(!observer.unsubscribe(&as_dyn));

        vm.set("x", 1).unwrap();
        assert!(log.changes.borrow().is_empty());
    }
}
