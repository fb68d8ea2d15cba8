#![forbid(unsafe_code)]

use tether_core::{BindingError, LifecycleFlags, Result, Scope, Value};

use super::Expression;
use super::evaluate::evaluate_args;
use crate::binding::{BindingInterceptor, PropertyBinding};
use crate::resources::{BindingBehavior, ServiceLocator};

fn behavior(locator: &dyn ServiceLocator, name: &str) -> Result<std::rc::Rc<dyn BindingBehavior>> {
    locator
        .binding_behavior(name)
        .ok_or_else(|| BindingError::BindingBehaviorNotFound(name.to_owned()))
}

impl Expression {
    /// Report every `(object, property)` this expression currently reads to
    /// `binding` so it can subscribe to them.
    ///
    /// Only the operands that evaluation would visit are connected: the
    /// taken branch of a conditional and the right side of `&&`/`||` only
    /// when it is reached.
    ///
    /// # Errors
    ///
    /// Propagates failures from `observe_property` and from evaluating
    /// intermediate objects.
    pub fn connect(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        binding: &dyn BindingInterceptor,
        part: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::AccessThis { .. } | Self::Primitive(_) => Ok(()),
            Self::AccessScope { name, ancestor } => match scope.resolve_context(name, *ancestor) {
                Some(context) => binding.observe_property(flags, &context, name),
                None => Ok(()),
            },
            Self::AccessMember { object, name } => {
                object.connect(flags, scope, locator, binding, part)?;
                if let Value::Object(target) = object.evaluate(flags, scope, locator, part)? {
                    binding.observe_property(flags, &target, name)?;
                }
                Ok(())
            }
            Self::AccessKeyed { object, key } => {
                object.connect(flags, scope, locator, binding, part)?;
                key.connect(flags, scope, locator, binding, part)?;
                if let Value::Object(target) = object.evaluate(flags, scope, locator, part)? {
                    let key = key.evaluate(flags, scope, locator, part)?;
                    binding.observe_property(flags, &target, &key.to_display_string())?;
                }
                Ok(())
            }
            Self::Unary { expression, .. } => {
                expression.connect(flags, scope, locator, binding, part)
            }
            Self::Binary {
                operator,
                left,
                right,
            } => {
                left.connect(flags, scope, locator, binding, part)?;
                if operator.is_short_circuit() {
                    let left = left.evaluate(flags, scope, locator, part)?;
                    if !operator.needs_right(&left) {
                        return Ok(());
                    }
                }
                right.connect(flags, scope, locator, binding, part)
            }
            Self::Conditional { condition, yes, no } => {
                condition.connect(flags, scope, locator, binding, part)?;
                if condition.evaluate(flags, scope, locator, part)?.is_truthy() {
                    yes.connect(flags, scope, locator, binding, part)
                } else {
                    no.connect(flags, scope, locator, binding, part)
                }
            }
            Self::ValueConverter {
                expression, args, ..
            }
            | Self::BindingBehavior {
                expression, args, ..
            } => {
                expression.connect(flags, scope, locator, binding, part)?;
                for arg in args {
                    arg.connect(flags, scope, locator, binding, part)?;
                }
                Ok(())
            }
        }
    }

    /// Bind hook. Runs nested behaviors innermost first.
    ///
    /// # Errors
    ///
    /// [`BindingError::BindingBehaviorNotFound`] for unregistered names, or
    /// whatever the behavior returns.
    pub fn bind(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        binding: &PropertyBinding,
    ) -> Result<()> {
        let Self::BindingBehavior {
            expression,
            name,
            args,
        } = self
        else {
            return Ok(());
        };
        if expression.has_bind() {
            expression.bind(flags, scope, locator, binding)?;
        }
        let behavior = behavior(locator, name)?;
        let args = evaluate_args(args, flags, scope, locator, None)?;
        tracing::trace!(binding = binding.id(), behavior = %name, "binding behavior attached");
        behavior.bind(flags, scope, binding, &args)
    }

    /// Unbind hook. Runs nested behaviors outermost first.
    ///
    /// # Errors
    ///
    /// [`BindingError::BindingBehaviorNotFound`] for unregistered names, or
    /// whatever the behavior returns.
    pub fn unbind(
        &self,
        flags: LifecycleFlags,
        scope: &Scope,
        locator: &dyn ServiceLocator,
        binding: &PropertyBinding,
    ) -> Result<()> {
        let Self::BindingBehavior {
            expression, name, ..
        } = self
        else {
            return Ok(());
        };
        behavior(locator, name)?.unbind(flags, scope, binding)?;
        if expression.has_bind() {
            expression.unbind(flags, scope, locator, binding)?;
        }
        Ok(())
    }
}
