#![forbid(unsafe_code)]

//! Core primitives for the Tether binding engine.
//!
//! This crate has no knowledge of observers or expressions; it provides the
//! vocabulary the runtime is written in:
//!
//! - [`flags`]: [`LifecycleFlags`], [`BindingMode`], [`BindingState`] and
//!   [`ExpressionKind`].
//! - [`value`]: the dynamic [`Value`] type with strict equality.
//! - [`object`]: [`ObjectRef`], a shared property bag with one observer slot
//!   per property.
//! - [`scope`]: the [`Scope`] chain used to resolve identifiers.
//! - [`error`]: [`BindingError`].

pub mod error;
pub mod flags;
pub mod object;
pub mod scope;
pub mod value;

pub use error::{BindingError, Result};
pub use flags::{BindingMode, BindingState, ExpressionKind, LifecycleFlags};
pub use object::{ObjectKind, ObjectRef, PropertyNotifier, WeakObjectRef};
pub use scope::Scope;
pub use value::Value;
