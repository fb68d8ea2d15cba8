#![forbid(unsafe_code)]

//! Test doubles and fixtures for Tether bindings.
//!
//! - [`RecordingObserverLocator`] wraps the default locator and records
//!   every write a binding makes to an element target.
//! - [`SpySubscriber`] counts the notifications it receives.
//! - [`Fixture`] bundles a view-model, an element target and the locators.
//! - [`strategies`] holds `proptest` strategies for values and paths.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether_core::{BindingMode, LifecycleFlags, ObjectRef, Result, Scope, Value};
use tether_runtime::ast::Expression;
use tether_runtime::binding::{BindingFactory, PropertyBinding};
use tether_runtime::config::BindingConfig;
use tether_runtime::observation::{
    Accessor, DefaultObserverLocator, ObserverLocator, PropertyObserver, Subscriber,
};
use tether_runtime::resources::{ResourceRegistry, ServiceLocator};

// ============================================================================
// Recording locator
// ============================================================================

/// One write made through a recorded target accessor or observer.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWrite {
    pub property: Rc<str>,
    pub value: Value,
    pub flags: LifecycleFlags,
}

type WriteLog = Rc<RefCell<Vec<TargetWrite>>>;

fn record(log: &WriteLog, property: &Rc<str>, value: &Value, flags: LifecycleFlags) {
    tracing::trace!(%property, %value, "target write recorded");
    log.borrow_mut().push(TargetWrite {
        property: Rc::clone(property),
        value: value.clone(),
        flags,
    });
}

/// Accessor recording every `set_value` before delegating.
pub struct RecordingAccessor {
    inner: Rc<dyn Accessor>,
    property: Rc<str>,
    log: WriteLog,
}

impl Accessor for RecordingAccessor {
    fn get_value(&self) -> Value {
        self.inner.get_value()
    }

    fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        record(&self.log, &self.property, &value, flags);
        self.inner.set_value(value, flags)
    }

    fn bind(&self, flags: LifecycleFlags) {
        self.inner.bind(flags);
    }

    fn unbind(&self, flags: LifecycleFlags) {
        self.inner.unbind(flags);
    }
}

/// Observer recording every `set_value` before delegating.
pub struct RecordingObserver {
    inner: Rc<dyn PropertyObserver>,
    property: Rc<str>,
    log: WriteLog,
}

impl Accessor for RecordingObserver {
    fn get_value(&self) -> Value {
        self.inner.get_value()
    }

    fn set_value(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        record(&self.log, &self.property, &value, flags);
        self.inner.set_value(value, flags)
    }

    fn bind(&self, flags: LifecycleFlags) {
        self.inner.bind(flags);
    }

    fn unbind(&self, flags: LifecycleFlags) {
        self.inner.unbind(flags);
    }
}

impl PropertyObserver for RecordingObserver {
    fn subscribe(&self, subscriber: Rc<dyn Subscriber>) {
        self.inner.subscribe(subscriber);
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        self.inner.unsubscribe(subscriber)
    }

    fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

/// [`DefaultObserverLocator`] that records writes to element targets.
///
/// View-model observers are returned unwrapped so their identity stays
/// stable across requests; element observers and accessors are wrapped.
#[derive(Default)]
pub struct RecordingObserverLocator {
    inner: DefaultObserverLocator,
    log: WriteLog,
    observer_requests: Cell<usize>,
}

impl RecordingObserverLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes recorded so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<TargetWrite> {
        self.log.borrow().clone()
    }

    /// Values written so far, oldest first.
    #[must_use]
    pub fn written_values(&self) -> Vec<Value> {
        self.log.borrow().iter().map(|w| w.value.clone()).collect()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn clear_writes(&self) {
        self.log.borrow_mut().clear();
    }

    /// How many observers have been requested for non-element objects.
    #[must_use]
    pub fn observer_requests(&self) -> usize {
        self.observer_requests.get()
    }
}

impl ObserverLocator for RecordingObserverLocator {
    fn get_observer(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn PropertyObserver> {
        let inner = self.inner.get_observer(flags, object, property);
        if !object.is_element() {
            self.observer_requests.set(self.observer_requests.get() + 1);
            return inner;
        }
        Rc::new(RecordingObserver {
            inner,
            property: Rc::from(property),
            log: Rc::clone(&self.log),
        })
    }

    fn get_accessor(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Rc<dyn Accessor> {
        let inner = self.inner.get_accessor(flags, object, property);
        if !object.is_element() {
            return inner;
        }
        Rc::new(RecordingAccessor {
            inner,
            property: Rc::from(property),
            log: Rc::clone(&self.log),
        })
    }
}

// ============================================================================
// Spy subscriber
// ============================================================================

/// Counts notifications and remembers the last one.
#[derive(Default)]
pub struct SpySubscriber {
    calls: Cell<usize>,
    last: RefCell<Option<(Value, LifecycleFlags)>>,
}

impl SpySubscriber {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    #[must_use]
    pub fn last(&self) -> Option<(Value, LifecycleFlags)> {
        self.last.borrow().clone()
    }
}

impl Subscriber for SpySubscriber {
    fn handle_change(
        &self,
        new_value: &Value,
        _old_value: &Value,
        flags: LifecycleFlags,
    ) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        *self.last.borrow_mut() = Some((new_value.clone(), flags));
        Ok(())
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A view-model, an `<input>` target and the collaborators bindings need.
pub struct Fixture {
    pub vm: ObjectRef,
    pub target: ObjectRef,
    pub locator: Rc<RecordingObserverLocator>,
    pub resources: Rc<ResourceRegistry>,
    pub scope: Rc<Scope>,
    config: BindingConfig,
}

impl Fixture {
    #[must_use]
    pub fn new(vm: ObjectRef) -> Self {
        Self::with_resources(vm, ResourceRegistry::new())
    }

    #[must_use]
    pub fn with_resources(vm: ObjectRef, resources: ResourceRegistry) -> Self {
        Self {
            scope: Scope::create(vm.clone()),
            vm,
            target: ObjectRef::element("input"),
            locator: Rc::new(RecordingObserverLocator::new()),
            resources: Rc::new(resources),
            config: BindingConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn factory(&self) -> BindingFactory {
        BindingFactory::with_config(
            Rc::clone(&self.locator) as Rc<dyn ObserverLocator>,
            Rc::clone(&self.resources) as Rc<dyn ServiceLocator>,
            self.config,
        )
    }

    /// A binding of `target.value` to `source`.
    #[must_use]
    pub fn binding(&self, source: Expression, mode: BindingMode) -> Rc<PropertyBinding> {
        self.factory().property(source, &self.target, "value", mode)
    }

    /// Bind with `FROM_BIND` to the fixture scope.
    ///
    /// # Errors
    ///
    /// Whatever `bind` returns.
    pub fn bind(&self, binding: &PropertyBinding) -> Result<()> {
        binding.bind(LifecycleFlags::FROM_BIND, &self.scope, None)
    }

    #[must_use]
    pub fn target_value(&self) -> Value {
        self.target.get("value")
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// `proptest` strategies.
pub mod strategies {
    use proptest::prelude::*;
    use tether_core::Value;

    /// Primitive values: numbers, short strings, booleans and null.
    pub fn primitive() -> impl Strategy<Value = Value> {
        prop_oneof![
            (-1000i32..1000).prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    /// Sequences of writes, consecutive duplicates included.
    pub fn writes(max: usize) -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(primitive(), 1..max)
    }

    /// Member paths `s0.s1...` with 1 to `max_depth` segments.
    pub fn path(max_depth: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-c]", 1..=max_depth)
            .prop_map(|segments| {
                segments
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| format!("{s}{i}"))
                    .collect()
            })
    }
}
