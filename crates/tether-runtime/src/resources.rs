#![forbid(unsafe_code)]

//! Named resources referenced from expressions: value converters
//! (`expr | name`) and binding behaviors (`expr & name`).

use std::rc::Rc;

use ahash::AHashMap;
use tether_core::{LifecycleFlags, Result, Scope, Value};

use crate::binding::PropertyBinding;

/// Transforms values flowing between source and target.
pub trait ValueConverter {
    /// Source to target.
    fn to_view(&self, value: Value, args: &[Value]) -> Value;

    /// Target to source. Identity unless overridden.
    fn from_view(&self, value: Value, _args: &[Value]) -> Value {
        value
    }
}

impl<F> ValueConverter for F
where
    F: Fn(Value, &[Value]) -> Value,
{
    fn to_view(&self, value: Value, args: &[Value]) -> Value {
        self(value, args)
    }
}

/// Decorates a binding for its bound lifetime.
///
/// `bind` runs before the binding's first evaluation and may swap the
/// binding's interceptor or source expression; `unbind` must undo it.
pub trait BindingBehavior {
    fn bind(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        binding: &PropertyBinding,
        args: &[Value],
    ) -> Result<()>;

    fn unbind(&self, flags: LifecycleFlags, scope: &Scope, binding: &PropertyBinding)
    -> Result<()>;
}

/// Resolves resources by name.
pub trait ServiceLocator {
    fn value_converter(&self, name: &str) -> Option<Rc<dyn ValueConverter>>;

    fn binding_behavior(&self, name: &str) -> Option<Rc<dyn BindingBehavior>>;
}

/// In-memory [`ServiceLocator`].
///
/// ```
/// use tether_runtime::resources::{ResourceRegistry, ServiceLocator};
/// use tether_core::Value;
///
/// let registry = ResourceRegistry::new()
///     .with_converter("upper", |v: Value, _: &[Value]| {
///         Value::from(v.to_display_string().to_uppercase())
///     });
/// assert!(registry.value_converter("upper").is_some());
/// ```
#[derive(Default)]
pub struct ResourceRegistry {
    converters: AHashMap<Rc<str>, Rc<dyn ValueConverter>>,
    behaviors: AHashMap<Rc<str>, Rc<dyn BindingBehavior>>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter, replacing any previous one with that name.
    pub fn register_converter(&mut self, name: &str, converter: impl ValueConverter + 'static) {
        self.converters.insert(Rc::from(name), Rc::new(converter));
    }

    /// Register a behavior, replacing any previous one with that name.
    pub fn register_behavior(&mut self, name: &str, behavior: impl BindingBehavior + 'static) {
        self.behaviors.insert(Rc::from(name), Rc::new(behavior));
    }

    #[must_use]
    pub fn with_converter(mut self, name: &str, converter: impl ValueConverter + 'static) -> Self {
        self.register_converter(name, converter);
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, name: &str, behavior: impl BindingBehavior + 'static) -> Self {
        self.register_behavior(name, behavior);
        self
    }
}

impl ServiceLocator for ResourceRegistry {
    fn value_converter(&self, name: &str) -> Option<Rc<dyn ValueConverter>> {
        self.converters.get(name).cloned()
    }

    fn binding_behavior(&self, name: &str) -> Option<Rc<dyn BindingBehavior>> {
        self.behaviors.get(name).cloned()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut converters: Vec<_> = self.converters.keys().collect();
        converters.sort();
        let mut behaviors: Vec<_> = self.behaviors.keys().collect();
        behaviors.sort();
        f.debug_struct("ResourceRegistry")
            .field("converters", &converters)
            .field("behaviors", &behaviors)
            .finish()
    }
}
