#![forbid(unsafe_code)]

//! Lifecycle flags, binding modes and binding states.
//!
//! Flags travel alongside every evaluate/connect/assign call. A binding
//! captures the [`LifecycleFlags::PERSISTENT_BINDING_FLAGS`] subset of the
//! flags it receives at bind time and re-applies them to every later read
//! and write until it is unbound.

use bitflags::bitflags;

bitflags! {
    /// Ambient flags threaded through binding operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LifecycleFlags: u32 {
        /// No flags.
        const NONE = 0;
        /// The change originated on the source side and must flow to the target.
        const UPDATE_TARGET_INSTANCE = 1 << 0;
        /// The change originated on the target side and must flow to the source.
        const UPDATE_SOURCE_EXPRESSION = 1 << 1;
        /// The operation is part of a `bind` (e.g. the implicit unbind of a rebind).
        const FROM_BIND = 1 << 2;
        /// The operation is part of an `unbind`.
        const FROM_UNBIND = 1 << 3;
        /// Missing properties are not coerced to `""` during evaluation.
        const IS_STRICT_BINDING_STRATEGY = 1 << 4;
        /// Evaluate even when a cached value is available.
        const MUST_EVALUATE = 1 << 5;
        /// Target writes are applied immediately instead of being queued.
        const NO_TARGET_OBSERVER_QUEUE = 1 << 6;

        /// Both direction markers.
        const DIRECTION = Self::UPDATE_TARGET_INSTANCE.bits()
            | Self::UPDATE_SOURCE_EXPRESSION.bits();
        /// Flags a binding keeps for the whole bound lifetime.
        const PERSISTENT_BINDING_FLAGS = Self::IS_STRICT_BINDING_STRATEGY.bits()
            | Self::MUST_EVALUATE.bits()
            | Self::NO_TARGET_OBSERVER_QUEUE.bits();
    }
}

impl LifecycleFlags {
    /// Replace the direction markers with `direction`, keeping everything else.
    #[must_use]
    pub fn with_direction(self, direction: LifecycleFlags) -> Self {
        (self - Self::DIRECTION) | (direction & Self::DIRECTION)
    }

    /// The subset captured at bind time.
    #[must_use]
    pub fn persistent(self) -> Self {
        self & Self::PERSISTENT_BINDING_FLAGS
    }

    #[must_use]
    pub fn is_strict(self) -> bool {
        self.contains(Self::IS_STRICT_BINDING_STRATEGY)
    }
}

/// Declared synchronization direction of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingMode {
    /// Push the source into the target once at bind time.
    OneTime,
    /// Keep the target in sync with the source.
    #[default]
    ToView,
    /// Keep the source in sync with the target.
    FromView,
    /// Both directions.
    TwoWay,
}

impl BindingMode {
    /// Whether source changes flow into the target after bind.
    #[must_use]
    pub const fn to_view(self) -> bool {
        matches!(self, Self::ToView | Self::TwoWay)
    }

    /// Whether target changes flow back into the source.
    #[must_use]
    pub const fn from_view(self) -> bool {
        matches!(self, Self::FromView | Self::TwoWay)
    }

    #[must_use]
    pub const fn is_one_time(self) -> bool {
        matches!(self, Self::OneTime)
    }

    /// Whether bind performs an initial source → target push.
    #[must_use]
    pub const fn pushes_on_bind(self) -> bool {
        matches!(self, Self::OneTime | Self::ToView | Self::TwoWay)
    }
}

/// Lifecycle state of a binding. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingState {
    #[default]
    Unbound,
    Binding,
    Bound,
    Unbinding,
}

impl BindingState {
    /// Whether a scope is attached in this state.
    #[must_use]
    pub const fn has_scope(self) -> bool {
        matches!(self, Self::Binding | Self::Bound)
    }
}

/// Node kinds of the expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    AccessThis,
    AccessScope,
    AccessMember,
    AccessKeyed,
    Primitive,
    Unary,
    Binary,
    Conditional,
    ValueConverter,
    BindingBehavior,
}

impl ExpressionKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccessThis => "AccessThis",
            Self::AccessScope => "AccessScope",
            Self::AccessMember => "AccessMember",
            Self::AccessKeyed => "AccessKeyed",
            Self::Primitive => "Primitive",
            Self::Unary => "Unary",
            Self::Binary => "Binary",
            Self::Conditional => "Conditional",
            Self::ValueConverter => "ValueConverter",
            Self::BindingBehavior => "BindingBehavior",
        }
    }
}

impl std::fmt::Display for ExpressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
