#![forbid(unsafe_code)]

//! Tether: expression-driven property bindings.
//!
//! A binding ties a target property (usually on a view element) to an
//! expression over a view-model and keeps the two synchronized in the
//! declared [`BindingMode`]. Member chains such as `user.address.city` bound
//! to-view get a per-segment observer chain, so a change only rebuilds the
//! part of the chain below it.
//!
//! ```
//! use tether::prelude::*;
//!
//! let vm = ObjectRef::new().with("user", ObjectRef::new().with("name", "Ann"));
//! let label = ObjectRef::element("span");
//! let factory = BindingFactory::new(
//!     Rc::new(DefaultObserverLocator::new()),
//!     Rc::new(ResourceRegistry::new()),
//! );
//! let binding = factory.property(
//!     Expression::path("user.name"),
//!     &label,
//!     "textContent",
//!     BindingMode::ToView,
//! );
//! binding.bind(LifecycleFlags::FROM_BIND, &Scope::create(vm.clone()), None)?;
//! assert_eq!(label.get("textContent"), Value::from("Ann"));
//!
//! vm.set("user", ObjectRef::new().with("name", "Cid"))?;
//! assert_eq!(label.get("textContent"), Value::from("Cid"));
//! # Ok::<(), tether::BindingError>(())
//! ```

pub use tether_core as primitives;
pub use tether_runtime as runtime;

pub use tether_core::{
    BindingError, BindingMode, BindingState, LifecycleFlags, ObjectRef, Result, Scope, Value,
};
pub use tether_runtime::{
    BindingConfig, BindingFactory, BindingInterceptor, DefaultObserverLocator, EvaluationStrategy,
    Expression, PropertyBinding, ResourceRegistry,
};

/// Everything needed to build and bind property bindings.
pub mod prelude {
    pub use std::rc::Rc;

    pub use tether_core::{
        BindingError, BindingMode, BindingState, LifecycleFlags, ObjectRef, Scope, Value,
    };
    pub use tether_runtime::ast::{BinaryOperator, Expression, UnaryOperator};
    pub use tether_runtime::binding::{BindingFactory, BindingInterceptor, PropertyBinding};
    pub use tether_runtime::config::BindingConfig;
    pub use tether_runtime::observation::{DefaultObserverLocator, ObserverLocator, Subscriber};
    pub use tether_runtime::resources::{
        BindingBehavior, ResourceRegistry, ServiceLocator, ValueConverter,
    };
}
