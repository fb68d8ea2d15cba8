#![forbid(unsafe_code)]

//! Binding engine for Tether.
//!
//! - [`observation`]: accessors, property observers and the locator that
//!   hands them out.
//! - [`ast`]: the expression tree bindings evaluate, assign and connect.
//! - [`resources`]: value converters, binding behaviors and the service
//!   locator resolving them.
//! - [`binding`]: [`PropertyBinding`](binding::PropertyBinding) with its
//!   full-expression and observer-chain strategies.
//! - [`config`]: [`BindingConfig`](config::BindingConfig).
//!
//! Everything is single-threaded: values, objects and bindings are `Rc`
//! based and every propagation runs synchronously inside the write that
//! triggered it.

pub mod ast;
pub mod binding;
pub mod config;
pub mod observation;
pub mod resources;

pub use ast::Expression;
pub use binding::{BindingFactory, BindingInterceptor, EvaluationStrategy, PropertyBinding};
pub use config::BindingConfig;
pub use observation::{
    Accessor, DefaultObserverLocator, ObserverLocator, PropertyObserver, Subscriber,
};
pub use resources::{BindingBehavior, ResourceRegistry, ServiceLocator, ValueConverter};
