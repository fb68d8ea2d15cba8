#![forbid(unsafe_code)]

//! Shared property bags standing in for view-models and binding targets.
//!
//! An [`ObjectRef`] is a reference-counted handle; cloning it shares the same
//! object. Each property may carry one installed observer, so observer
//! identity is the `(object, property)` pair. The object owns its observers
//! and observers refer back through a [`WeakObjectRef`], so an object graph
//! with observers installed never forms an `Rc` cycle.
//!
//! # Write origins
//!
//! | Method | Flags reported to the observer |
//! |--------|--------------------------------|
//! | [`ObjectRef::set`] | `UPDATE_TARGET_INSTANCE` |
//! | [`ObjectRef::dispatch_input`] | `UPDATE_SOURCE_EXPRESSION` |
//! | [`ObjectRef::write`] | caller supplied |
//!
//! Writing a value strictly equal to the current one is a no-op and notifies
//! nobody.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::error::Result;
use crate::flags::LifecycleFlags;
use crate::value::Value;

/// Hook installed on a property and invoked after each value change.
pub trait PropertyNotifier {
    fn notify(&self, new_value: &Value, old_value: &Value, flags: LifecycleFlags) -> Result<()>;
}

/// What an object models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// A view-model or any other plain data object.
    Plain,
    /// A view element used as a binding target.
    Element { tag: Rc<str> },
}

struct InstalledObserver {
    notifier: Rc<dyn PropertyNotifier>,
    handle: Rc<dyn Any>,
}

struct ObjectInner {
    kind: ObjectKind,
    properties: RefCell<AHashMap<Rc<str>, Value>>,
    observers: RefCell<AHashMap<Rc<str>, InstalledObserver>>,
}

/// Shared handle to an object.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<ObjectInner>,
}

/// Non-owning handle to an object.
#[derive(Clone)]
pub struct WeakObjectRef {
    inner: Weak<ObjectInner>,
}

impl ObjectRef {
    /// Create an empty plain object.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Create an empty element with the given tag name.
    #[must_use]
    pub fn element(tag: &str) -> Self {
        Self::with_kind(ObjectKind::Element {
            tag: Rc::from(tag),
        })
    }

    fn with_kind(kind: ObjectKind) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                kind,
                properties: RefCell::new(AHashMap::new()),
                observers: RefCell::new(AHashMap::new()),
            }),
        }
    }

    /// Builder-style initialization. Does not notify.
    #[must_use]
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        self.inner
            .properties
            .borrow_mut()
            .insert(Rc::from(name), value.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ObjectKind {
        &self.inner.kind
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.inner.kind, ObjectKind::Element { .. })
    }

    /// Current value of `name`, `Undefined` if absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.inner
            .properties
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner.properties.borrow().contains_key(name)
    }

    /// Property names in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner.properties.borrow().keys().cloned().collect()
    }

    /// Programmatic write.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write(name, value.into(), LifecycleFlags::UPDATE_TARGET_INSTANCE)
    }

    /// Write caused by user interaction with a view element.
    pub fn dispatch_input(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write(
            name,
            value.into(),
            LifecycleFlags::UPDATE_SOURCE_EXPRESSION,
        )
    }

    /// Store `value` and, if it changed, notify the installed observer.
    pub fn write(&self, name: &str, value: Value, flags: LifecycleFlags) -> Result<()> {
        let old = {
            let mut props = self.inner.properties.borrow_mut();
            match props.get_mut(name) {
                Some(slot) if slot.strict_eq(&value) => return Ok(()),
                Some(slot) => std::mem::replace(slot, value.clone()),
                None => {
                    props.insert(Rc::from(name), value.clone());
                    Value::Undefined
                }
            }
        };
        let notifier = self
            .inner
            .observers
            .borrow()
            .get(name)
            .map(|installed| Rc::clone(&installed.notifier));
        match notifier {
            Some(notifier) => notifier.notify(&value, &old, flags),
            None => Ok(()),
        }
    }

    /// The observer installed on `name`, if it has type `T`.
    #[must_use]
    pub fn observer<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        let handle = self
            .inner
            .observers
            .borrow()
            .get(name)
            .map(|installed| Rc::clone(&installed.handle))?;
        handle.downcast::<T>().ok()
    }

    /// Return the observer of type `T` on `name`, installing one from `make`
    /// if there is none (or the installed one has another type).
    pub fn observer_or_install<T, F>(&self, name: &str, make: F) -> Rc<T>
    where
        T: PropertyNotifier + Any,
        F: FnOnce() -> Rc<T>,
    {
        if let Some(existing) = self.observer::<T>(name) {
            return existing;
        }
        let observer = make();
        self.inner.observers.borrow_mut().insert(
            Rc::from(name),
            InstalledObserver {
                notifier: Rc::clone(&observer) as Rc<dyn PropertyNotifier>,
                handle: Rc::clone(&observer) as Rc<dyn Any>,
            },
        );
        observer
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObjectRef");
        if let ObjectKind::Element { tag } = &self.inner.kind {
            s.field("tag", tag);
        }
        s.field("addr", &Rc::as_ptr(&self.inner))
            .field("properties", &self.inner.properties.borrow().len())
            .finish()
    }
}

impl WeakObjectRef {
    #[must_use]
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.inner.upgrade().map(|inner| ObjectRef { inner })
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObjectRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
