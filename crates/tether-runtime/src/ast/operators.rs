#![forbid(unsafe_code)]

//! Operator semantics for unary and binary expressions.

use std::cmp::Ordering;
use std::fmt;

use tether_core::{LifecycleFlags, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    Void,
}

impl UnaryOperator {
    #[must_use]
    pub fn apply(self, operand: &Value) -> Value {
        match self {
            Self::Not => Value::Bool(!operand.is_truthy()),
            Self::Negate => Value::Number(-operand.to_number()),
            Self::Plus => Value::Number(operand.to_number()),
            Self::Void => Value::Undefined,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
            Self::Plus => "+",
            Self::Void => "void ",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOperator {
    /// `&&` and `||` evaluate their right operand conditionally.
    #[must_use]
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Whether the right operand is evaluated for this left value.
    #[must_use]
    pub fn needs_right(self, left: &Value) -> bool {
        match self {
            Self::And => left.is_truthy(),
            Self::Or => !left.is_truthy(),
            _ => true,
        }
    }

    /// Combine two evaluated operands. Short-circuit operators expect the
    /// caller to have consulted [`needs_right`](Self::needs_right) first.
    #[must_use]
    pub fn apply(self, left: Value, right: Value, flags: LifecycleFlags) -> Value {
        match self {
            Self::And | Self::Or => {
                if self.needs_right(&left) {
                    right
                } else {
                    left
                }
            }
            Self::LooseEq => Value::Bool(left.loose_eq(&right)),
            Self::LooseNe => Value::Bool(!left.loose_eq(&right)),
            Self::StrictEq => Value::Bool(left.strict_eq(&right)),
            Self::StrictNe => Value::Bool(!left.strict_eq(&right)),
            Self::Lt => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
            Self::Le => Value::Bool(matches!(
                compare(&left, &right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            Self::Gt => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
            Self::Ge => Value::Bool(matches!(
                compare(&left, &right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            Self::Add => add(left, right, flags),
            Self::Sub => Value::Number(left.to_number() - right.to_number()),
            Self::Mul => Value::Number(left.to_number() * right.to_number()),
            Self::Div => Value::Number(left.to_number() / right.to_number()),
            Self::Rem => Value::Number(left.to_number() % right.to_number()),
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::LooseEq => "==",
            Self::LooseNe => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn is_textual(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Object(_))
}

fn script_add(left: &Value, right: &Value) -> Value {
    if is_textual(left) || is_textual(right) {
        let mut text = left.to_display_string();
        text.push_str(&right.to_display_string());
        Value::from(text)
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

/// `+` with the lenient handling of missing operands used outside strict
/// mode: a falsy operand next to a number counts as `0`, next to a string
/// as `""`.
fn add(left: Value, right: Value, flags: LifecycleFlags) -> Value {
    if flags.is_strict() || (left.is_truthy() && right.is_truthy()) {
        return script_add(&left, &right);
    }
    let numeric = matches!(left, Value::Number(_)) || matches!(right, Value::Number(_));
    let textual = matches!(left, Value::String(_)) || matches!(right, Value::String(_));
    let or_default = |value: Value, default: Value| {
        if value.is_truthy() { value } else { default }
    };
    if numeric {
        script_add(
            &or_default(left, Value::from(0)),
            &or_default(right, Value::from(0)),
        )
    } else if textual {
        script_add(
            &or_default(left, Value::from("")),
            &or_default(right, Value::from("")),
        )
    } else {
        script_add(&left, &right)
    }
}
