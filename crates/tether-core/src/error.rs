#![forbid(unsafe_code)]

//! Error type shared by every binding operation.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `MissingDirection` | A notification carried neither direction flag | Fatal, returned immediately |
//! | `UnsupportedChainNode` | A non member-access node reached the observer chain | Fatal, returned immediately |
//! | `NotAssignable` | A from-view write targeted a read-only expression | Returned to the writer |
//! | `*NotFound` | A converter/behavior name is not registered | Returned from bind/evaluate |
//!
//! Reads through a currently-null object are not errors: they resolve to
//! `Undefined`.

use crate::flags::{ExpressionKind, LifecycleFlags};

/// Errors raised by bindings, expressions and observers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    /// `handle_change` was called with neither `UPDATE_TARGET_INSTANCE`
    /// nor `UPDATE_SOURCE_EXPRESSION`.
    #[error("binding {binding} received a change notification without a direction flag ({flags:?})")]
    MissingDirection { binding: u64, flags: LifecycleFlags },

    /// A node other than `AccessScope`/`AccessMember` reached the observer chain builder.
    #[error("invalid expression leaked into optimized mode: {kind}")]
    UnsupportedChainNode { kind: ExpressionKind },

    #[error("{kind} expression is not assignable")]
    NotAssignable { kind: ExpressionKind },

    #[error("value converter '{0}' is not registered")]
    ValueConverterNotFound(String),

    #[error("binding behavior '{0}' is not registered")]
    BindingBehaviorNotFound(String),

    /// The binding was dropped while one of its subscribers was still notified.
    #[error("binding {0} was released")]
    Released(u64),
}

pub type Result<T, E = BindingError> = std::result::Result<T, E>;
