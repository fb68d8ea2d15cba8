#![forbid(unsafe_code)]

//! Integration tests: binding behaviors and interceptor decorators.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tether_core::{
    BindingError, BindingMode, BindingState, LifecycleFlags, ObjectRef, Result, Scope, Value,
};
use tether_harness::Fixture;
use tether_runtime::ast::Expression;
use tether_runtime::binding::{BindingInterceptor, PropertyBinding};
use tether_runtime::observation::{PropertyObserver, SetterObserver, Subscriber};
use tether_runtime::resources::{BindingBehavior, ResourceRegistry};

// ============================================================================
// Decorator: upper-cases everything written to the target
// ============================================================================

struct Shout {
    binding: Weak<PropertyBinding>,
}

impl Shout {
    fn binding(&self) -> Result<Rc<PropertyBinding>> {
        self.binding.upgrade().ok_or(BindingError::Released(0))
    }
}

impl Subscriber for Shout {
    fn handle_change(&self, new_value: &Value, old_value: &Value, flags: LifecycleFlags) -> Result<()> {
        self.binding()?.handle_change(new_value, old_value, flags)
    }
}

impl BindingInterceptor for Shout {
    fn observe_property(&self, flags: LifecycleFlags, object: &ObjectRef, property: &str) -> Result<()> {
        self.binding()?.observe_property(flags, object, property)
    }

    fn update_target(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        let loud = Value::from(value.to_display_string().to_uppercase());
        BindingInterceptor::update_target(self.binding()?.as_ref(), loud, flags)
    }

    fn update_source(&self, value: Value, flags: LifecycleFlags) -> Result<()> {
        self.binding()?.update_source(value, flags)
    }

    fn unobserve(&self, all: bool) {
        if let Ok(binding) = self.binding() {
            binding.unobserve(all);
        }
    }

    fn unbind(&self, flags: LifecycleFlags) -> Result<()> {
        PropertyBinding::unbind(self.binding()?.as_ref(), flags)
    }

    fn as_subscriber(self: Rc<Self>) -> Rc<dyn Subscriber> {
        self
    }
}

/// Installs [`Shout`] on bind; counters are shared between clones.
#[derive(Clone, Default)]
struct ShoutBehavior {
    binds: Rc<Cell<u32>>,
    unbinds: Rc<Cell<u32>>,
}

impl BindingBehavior for ShoutBehavior {
    fn bind(&self, _: LifecycleFlags, _: &Scope, binding: &PropertyBinding, _: &[Value]) -> Result<()> {
        self.binds.set(self.binds.get() + 1);
        binding.set_interceptor(Rc::new(Shout {
            binding: binding.downgrade(),
        }));
        Ok(())
    }

    fn unbind(&self, _: LifecycleFlags, _: &Scope, binding: &PropertyBinding) -> Result<()> {
        self.unbinds.set(self.unbinds.get() + 1);
        binding.clear_interceptor();
        Ok(())
    }
}

/// Replaces the source expression with its first argument.
struct Constant;

impl BindingBehavior for Constant {
    fn bind(&self, _: LifecycleFlags, _: &Scope, binding: &PropertyBinding, args: &[Value]) -> Result<()> {
        let value = args.first().cloned().unwrap_or_default();
        binding.replace_source_expression(Expression::Primitive(value));
        Ok(())
    }

    fn unbind(&self, _: LifecycleFlags, _: &Scope, _: &PropertyBinding) -> Result<()> {
        Ok(())
    }
}

fn shout_fixture(vm: ObjectRef) -> (Fixture, ShoutBehavior) {
    let behavior = ShoutBehavior::default();
    let fx = Fixture::with_resources(
        vm,
        ResourceRegistry::new()
            .with_behavior("shout", behavior.clone())
            .with_behavior("constant", Constant),
    );
    (fx, behavior)
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn behavior_installs_decorator_for_bound_lifetime() {
    let (fx, behavior) = shout_fixture(ObjectRef::new().with("name", "ann"));
    let binding = fx.binding(Expression::path("name").behavior("shout", vec![]), BindingMode::ToView);
    fx.bind(&binding).unwrap();
    assert_eq!(behavior.binds.get(), 1);
    assert_eq!(fx.target_value(), Value::from("ANN"));

    fx.vm.set("name", "bea").unwrap();
    assert_eq!(fx.target_value(), Value::from("BEA"));

    binding.unbind(LifecycleFlags::NONE).unwrap();
    assert_eq!(behavior.unbinds.get(), 1);
    assert_eq!(SetterObserver::for_property(&fx.vm, "name").subscriber_count(), 0);

    fx.vm.set("name", "cid").unwrap();
    assert_eq!(fx.target_value(), Value::from("BEA"));
}

#[test]
fn decorator_receives_change_notifications() {
    let (fx, _) = shout_fixture(ObjectRef::new().with("first", "a").with("last", "b"));
    let expr = Expression::binary(
        tether_runtime::ast::BinaryOperator::Add,
        Expression::scope("first"),
        Expression::scope("last"),
    )
    .behavior("shout", vec![]);
    let binding = fx.binding(expr, BindingMode::ToView);
    fx.bind(&binding).unwrap();
    assert_eq!(fx.target_value(), Value::from("AB"));
    assert_eq!(binding.observer_slots(), 2);

    fx.vm.set("last", "z").unwrap();
    assert_eq!(fx.target_value(), Value::from("AZ"));
}

#[test]
fn nested_behaviors_bind_inner_first_and_unbind_outer_first() {
    let (fx, behavior) = shout_fixture(ObjectRef::new().with("name", "ann"));
    let expr = Expression::path("name")
        .behavior("constant", vec![Expression::primitive("fixed")])
        .behavior("shout", vec![]);
    let binding = fx.binding(expr, BindingMode::ToView);
    fx.bind(&binding).unwrap();
    assert_eq!(fx.target_value(), Value::from("FIXED"));
    assert!(matches!(*binding.source_expression(), Expression::Primitive(_)));

    binding.unbind(LifecycleFlags::NONE).unwrap();
    assert_eq!(behavior.unbinds.get(), 1, "unbind reaches the original behaviors");
}

#[test]
fn unknown_behavior_fails_bind() {
    let fx = Fixture::new(ObjectRef::new().with("name", "ann"));
    let binding = fx.binding(Expression::path("name").behavior("debounce", vec![]), BindingMode::ToView);
    let err = fx.bind(&binding).unwrap_err();
    assert_eq!(err, BindingError::BindingBehaviorNotFound("debounce".into()));
    assert_eq!(binding.state(), BindingState::Unbound);
}

#[test]
fn interceptor_can_be_installed_directly() {
    let fx = Fixture::new(ObjectRef::new().with("name", "ann"));
    let binding = fx.binding(Expression::path("name"), BindingMode::ToView);
    binding.set_interceptor(Rc::new(Shout {
        binding: binding.downgrade(),
    }));
    fx.bind(&binding).unwrap();
    assert_eq!(fx.target_value(), Value::from("ANN"));

    fx.vm.set("name", "bea").unwrap();
    assert_eq!(fx.target_value(), Value::from("BEA"));

    binding.clear_interceptor();
    fx.vm.set("name", "cid").unwrap();
    assert_eq!(fx.target_value(), Value::from("cid"));
}
