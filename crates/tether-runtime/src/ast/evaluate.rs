#![forbid(unsafe_code)]

use tether_core::{BindingError, LifecycleFlags, ObjectRef, Result, Scope, Value};

use super::Expression;
use crate::resources::{ServiceLocator, ValueConverter};

/// Outside strict mode a missing scope or member read renders as `""`.
fn coerce(value: Value, flags: LifecycleFlags) -> Value {
    if !flags.is_strict() && value.is_nullish() {
        Value::from("")
    } else {
        value
    }
}

fn read(object: &Value, property: &str) -> Value {
    object
        .as_object()
        .map(|object| object.get(property))
        .unwrap_or_default()
}

fn converter(locator: &dyn ServiceLocator, name: &str) -> Result<std::rc::Rc<dyn ValueConverter>> {
    locator
        .value_converter(name)
        .ok_or_else(|| BindingError::ValueConverterNotFound(name.to_owned()))
}

pub(super) fn evaluate_args(
    args: &[Expression],
    flags: LifecycleFlags,
    scope: &Scope,
    locator: &dyn ServiceLocator,
    part: Option<&str>,
) -> Result<Vec<Value>> {
    args.iter()
        .map(|arg| arg.evaluate(flags, scope, locator, part))
        .collect()
}

impl Expression {
    /// Compute the current value.
    ///
    /// # Errors
    ///
    /// Only resource lookups fail; reads through missing objects resolve to
    /// `Undefined` (or `""` outside strict mode).
    pub fn evaluate(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        part: Option<&str>,
    ) -> Result<Value> {
        Ok(match self {
            Self::AccessThis { ancestor } => scope
                .ancestor(*ancestor)
                .map(|scope| Value::Object(scope.binding_context().clone()))
                .unwrap_or_default(),
            Self::AccessScope { name, ancestor } => {
                let value = scope
                    .resolve_context(name, *ancestor)
                    .map(|context| context.get(name))
                    .unwrap_or_default();
                coerce(value, flags)
            }
            Self::AccessMember { object, name } => {
                let object = object.evaluate(flags, scope, locator, part)?;
                coerce(read(&object, name), flags)
            }
            Self::AccessKeyed { object, key } => {
                let object = object.evaluate(flags, scope, locator, part)?;
                let key = key.evaluate(flags, scope, locator, part)?;
                coerce(read(&object, &key.to_display_string()), flags)
            }
            Self::Primitive(value) => value.clone(),
            Self::Unary {
                operator,
                expression,
            } => operator.apply(&expression.evaluate(flags, scope, locator, part)?),
            Self::Binary {
                operator,
                left,
                right,
            } => {
                let left = left.evaluate(flags, scope, locator, part)?;
                if !operator.needs_right(&left) {
                    return Ok(left);
                }
                let right = right.evaluate(flags, scope, locator, part)?;
                operator.apply(left, right, flags)
            }
            Self::Conditional { condition, yes, no } => {
                if condition.evaluate(flags, scope, locator, part)?.is_truthy() {
                    yes.evaluate(flags, scope, locator, part)?
                } else {
                    no.evaluate(flags, scope, locator, part)?
                }
            }
            Self::ValueConverter {
                expression,
                name,
                args,
            } => {
                let converter = converter(locator, name)?;
                let value = expression.evaluate(flags, scope, locator, part)?;
                let args = evaluate_args(args, flags, scope, locator, part)?;
                converter.to_view(value, &args)
            }
            Self::BindingBehavior { expression, .. } => {
                expression.evaluate(flags, scope, locator, part)?
            }
        })
    }

    /// Write `value` back into the source.
    ///
    /// Member and keyed writes through a missing object first install a
    /// fresh plain object at that position.
    ///
    /// # Errors
    ///
    /// [`BindingError::NotAssignable`] for read-only nodes, plus resource
    /// lookup failures.
    pub fn assign(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        value: Value,
        part: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::AccessScope { name, ancestor } => match scope.resolve_context(name, *ancestor) {
                Some(context) => context.write(name, value, flags),
                None => Ok(()),
            },
            Self::AccessMember { object, name } => {
                let target = self.ensure_object(object, flags, scope, locator, part)?;
                target.write(name, value, flags)
            }
            Self::AccessKeyed { object, key } => {
                let key = key.evaluate(flags, scope, locator, part)?;
                let target = self.ensure_object(object, flags, scope, locator, part)?;
                target.write(&key.to_display_string(), value, flags)
            }
            Self::ValueConverter {
                expression,
                name,
                args,
            } => {
                let converter = converter(locator, name)?;
                let args = evaluate_args(args, flags, scope, locator, part)?;
                let value = converter.from_view(value, &args);
                expression.assign(flags, scope, locator, value, part)
            }
            Self::BindingBehavior { expression, .. } => {
                expression.assign(flags, scope, locator, value, part)
            }
            _ => Err(BindingError::NotAssignable { kind: self.kind() }),
        }
    }

    fn ensure_object(
        &self,
        object: &Expression,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        part: Option<&str>,
    ) -> Result<ObjectRef> {
        if let Value::Object(existing) = object.evaluate(flags, scope, locator, part)? {
            return Ok(existing);
        }
        let created = ObjectRef::new();
        tracing::trace!(expression = %object, "creating intermediate object for assignment");
        object.assign(flags, scope, locator, Value::Object(created.clone()), part)?;
        Ok(created)
    }
}
