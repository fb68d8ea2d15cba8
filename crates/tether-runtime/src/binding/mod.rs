#![forbid(unsafe_code)]

//! Property bindings between a source expression and a target property.
//!
//! A [`PropertyBinding`] keeps `target.property` in sync with an
//! [`Expression`] evaluated against a [`Scope`](tether_core::Scope), in the
//! direction(s) given by its [`BindingMode`].
//!
//! # Evaluation strategies
//!
//! The strategy is chosen once, at construction:
//!
//! - [`EvaluationStrategy::FullExpression`]: every change re-evaluates the
//!   whole expression and re-connects its dependencies, dropping those that
//!   were not touched again. Supports all modes and all expression kinds.
//! - [`EvaluationStrategy::ObserverChain`]: for to-view member chains
//!   (`a.b.c`). One subscription per segment; a change at a non-leaf
//!   position rebuilds only the suffix below it, a leaf change is pushed
//!   straight to the target.
//!
//! # Invariants
//!
//! 1. A binding is in exactly one [`BindingState`](tether_core::BindingState).
//! 2. The scope is set iff the state is `Binding` or `Bound`.
//! 3. After `unbind`, no observer holds a subscription registered by the
//!    binding.
//! 4. Target writes happen only when the new value differs from the
//!    target's current value.
//!
//! # Failure Modes
//!
//! - Notification without a direction flag: [`BindingError::MissingDirection`](tether_core::BindingError::MissingDirection).
//! - Non member-access node in the observer chain: [`BindingError::UnsupportedChainNode`](tether_core::BindingError::UnsupportedChainNode).
//! - Errors during `bind` roll the binding back to `Unbound`.

mod chain;
mod connectable;
mod factory;
mod observer_chain;
mod property;

use std::rc::Rc;

use tether_core::{BindingMode, LifecycleFlags, ObjectRef, Result, Value};

use crate::ast::Expression;
use crate::observation::Subscriber;

pub use chain::ChainSubscriber;
pub use connectable::{Connectable, ObserverSlot};
pub use factory::BindingFactory;
pub use observer_chain::{ChainLink, ObserverChain, build_observer_chain};
pub use property::PropertyBinding;

/// The object receiving a binding's change traffic.
///
/// A binding is its own interceptor until a decorator is installed with
/// [`PropertyBinding::set_interceptor`]. Decorators usually hold the binding
/// and forward to it after adjusting values or timing.
pub trait BindingInterceptor: Subscriber {
    /// Subscribe to `object.property` for the binding's current version.
    fn observe_property(
        &self,
        flags: LifecycleFlags,
        object: &ObjectRef,
        property: &str,
    ) -> Result<()>;

    /// Write into the target.
    fn update_target(&self, value: Value, flags: LifecycleFlags) -> Result<()>;

    /// Write into the source expression.
    fn update_source(&self, value: Value, flags: LifecycleFlags) -> Result<()>;

    /// Drop stale dependencies, or all of them when `all` is set.
    fn unobserve(&self, all: bool);

    fn unbind(&self, flags: LifecycleFlags) -> Result<()>;

    /// This interceptor as the listener registered with observers.
    fn as_subscriber(self: Rc<Self>) -> Rc<dyn Subscriber>;
}

/// How a binding turns source changes into target writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationStrategy {
    FullExpression,
    ObserverChain,
}

impl EvaluationStrategy {
    /// Chain evaluation for to-view bindings over pure member chains.
    #[must_use]
    pub fn select(expression: &Expression, mode: BindingMode) -> Self {
        if mode == BindingMode::ToView && expression.is_member_chain() {
            Self::ObserverChain
        } else {
            Self::FullExpression
        }
    }
}
