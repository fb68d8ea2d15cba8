#![forbid(unsafe_code)]

//! Expression tree evaluated by bindings.
//!
//! Parsing is out of scope: trees are built with the constructors on
//! [`Expression`] (or [`Expression::path`] for dotted member chains).
//!
//! Every node supports four operations:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | `evaluate` | Compute the current value against a [`Scope`](tether_core::Scope) |
//! | `assign` | Write a value back (assignable nodes only) |
//! | `connect` | Evaluate while reporting each `(object, property)` read to the binding |
//! | `bind`/`unbind` | Lifecycle hooks, only meaningful on binding behaviors |

mod connect;
mod evaluate;
mod operators;

use std::fmt;
use std::rc::Rc;

use tether_core::{ExpressionKind, Value};

pub use operators::{BinaryOperator, UnaryOperator};

/// A node of the expression tree.
#[derive(Debug, Clone)]
pub enum Expression {
    /// `$this`, or `$parent` when `ancestor > 0`.
    AccessThis { ancestor: u32 },
    /// An identifier resolved through the scope chain.
    AccessScope { name: Rc<str>, ancestor: u32 },
    /// `object.name`
    AccessMember {
        object: Box<Expression>,
        name: Rc<str>,
    },
    /// `object[key]`
    AccessKeyed {
        object: Box<Expression>,
        key: Box<Expression>,
    },
    Primitive(Value),
    Unary {
        operator: UnaryOperator,
        expression: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `condition ? yes : no`
    Conditional {
        condition: Box<Expression>,
        yes: Box<Expression>,
        no: Box<Expression>,
    },
    /// `expression | name:arg1:arg2`
    ValueConverter {
        expression: Box<Expression>,
        name: Rc<str>,
        args: Vec<Expression>,
    },
    /// `expression & name:arg1:arg2`
    BindingBehavior {
        expression: Box<Expression>,
        name: Rc<str>,
        args: Vec<Expression>,
    },
}

impl Expression {
    /// An identifier looked up in the scope chain.
    #[must_use]
    pub fn scope(name: &str) -> Self {
        Self::AccessScope {
            name: Rc::from(name),
            ancestor: 0,
        }
    }

    /// An identifier looked up `ancestor` scopes up.
    #[must_use]
    pub fn ancestor_scope(name: &str, ancestor: u32) -> Self {
        Self::AccessScope {
            name: Rc::from(name),
            ancestor,
        }
    }

    #[must_use]
    pub fn this() -> Self {
        Self::AccessThis { ancestor: 0 }
    }

    #[must_use]
    pub fn primitive(value: impl Into<Value>) -> Self {
        Self::Primitive(value.into())
    }

    /// `self.name`
    #[must_use]
    pub fn member(self, name: &str) -> Self {
        Self::AccessMember {
            object: Box::new(self),
            name: Rc::from(name),
        }
    }

    /// `self[key]`
    #[must_use]
    pub fn keyed(self, key: Expression) -> Self {
        Self::AccessKeyed {
            object: Box::new(self),
            key: Box::new(key),
        }
    }

    #[must_use]
    pub fn unary(operator: UnaryOperator, expression: Expression) -> Self {
        Self::Unary {
            operator,
            expression: Box::new(expression),
        }
    }

    #[must_use]
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn conditional(condition: Expression, yes: Expression, no: Expression) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            yes: Box::new(yes),
            no: Box::new(no),
        }
    }

    /// `self | name:args...`
    #[must_use]
    pub fn convert(self, name: &str, args: Vec<Expression>) -> Self {
        Self::ValueConverter {
            expression: Box::new(self),
            name: Rc::from(name),
            args,
        }
    }

    /// `self & name:args...`
    #[must_use]
    pub fn behavior(self, name: &str, args: Vec<Expression>) -> Self {
        Self::BindingBehavior {
            expression: Box::new(self),
            name: Rc::from(name),
            args,
        }
    }

    /// Build a member chain from a dotted path such as `user.address.city`.
    ///
    /// Leading `$parent` segments raise the ancestor count of the first
    /// identifier; a lone `$this` yields [`Expression::AccessThis`].
    #[must_use]
    pub fn path(path: &str) -> Self {
        let mut ancestor = 0;
        let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
        while segments.peek() == Some(&"$parent") {
            ancestor += 1;
            segments.next();
        }
        let mut expression = match segments.next() {
            Some("$this") | None => Self::AccessThis { ancestor },
            Some(first) => Self::ancestor_scope(first, ancestor),
        };
        for segment in segments {
            expression = expression.member(segment);
        }
        expression
    }

    #[must_use]
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Self::AccessThis { .. } => ExpressionKind::AccessThis,
            Self::AccessScope { .. } => ExpressionKind::AccessScope,
            Self::AccessMember { .. } => ExpressionKind::AccessMember,
            Self::AccessKeyed { .. } => ExpressionKind::AccessKeyed,
            Self::Primitive(_) => ExpressionKind::Primitive,
            Self::Unary { .. } => ExpressionKind::Unary,
            Self::Binary { .. } => ExpressionKind::Binary,
            Self::Conditional { .. } => ExpressionKind::Conditional,
            Self::ValueConverter { .. } => ExpressionKind::ValueConverter,
            Self::BindingBehavior { .. } => ExpressionKind::BindingBehavior,
        }
    }

    /// Whether this is a pure chain of scope/member accesses (`a`, `a.b.c`).
    #[must_use]
    pub fn is_member_chain(&self) -> bool {
        match self {
            Self::AccessScope { .. } => true,
            Self::AccessMember { object, .. } => object.is_member_chain(),
            _ => false,
        }
    }

    /// Whether the node has `bind`/`unbind` hooks.
    #[must_use]
    pub fn has_bind(&self) -> bool {
        matches!(self, Self::BindingBehavior { .. })
    }

    #[must_use]
    pub fn is_assignable(&self) -> bool {
        match self {
            Self::AccessScope { .. } | Self::AccessMember { .. } | Self::AccessKeyed { .. } => {
                true
            }
            Self::ValueConverter { expression, .. } | Self::BindingBehavior { expression, .. } => {
                expression.is_assignable()
            }
            _ => false,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    for arg in args {
        write!(f, ":{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessThis { ancestor: 0 } => f.write_str("$this"),
            Self::AccessThis { ancestor } => {
                for i in 0..*ancestor {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str("$parent")?;
                }
                Ok(())
            }
            Self::AccessScope { name, ancestor } => {
                for _ in 0..*ancestor {
                    f.write_str("$parent.")?;
                }
                f.write_str(name)
            }
            Self::AccessMember { object, name } => write!(f, "{object}.{name}"),
            Self::AccessKeyed { object, key } => write!(f, "{object}[{key}]"),
            Self::Primitive(Value::String(s)) => write!(f, "'{s}'"),
            Self::Primitive(value) => write!(f, "{value}"),
            Self::Unary {
                operator,
                expression,
            } => write!(f, "{operator}{expression}"),
            Self::Binary {
                operator,
                left,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Self::Conditional { condition, yes, no } => {
                write!(f, "({condition} ? {yes} : {no})")
            }
            Self::ValueConverter {
                expression,
                name,
                args,
            } => {
                write!(f, "{expression} | {name}")?;
                write_args(f, args)
            }
            Self::BindingBehavior {
                expression,
                name,
                args,
            } => {
                write!(f, "{expression} & {name}")?;
                write_args(f, args)
            }
        }
    }
}
