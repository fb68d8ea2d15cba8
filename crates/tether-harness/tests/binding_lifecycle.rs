#![forbid(unsafe_code)]

//! Integration tests: bind/unbind state machine and teardown.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::{
    BindingError, BindingMode, BindingState, LifecycleFlags, ObjectRef, Result, Scope, Value,
};
use tether_harness::Fixture;
use tether_runtime::ast::{BinaryOperator, Expression};
use tether_runtime::binding::{EvaluationStrategy, PropertyBinding};
use tether_runtime::config::BindingConfig;
use tether_runtime::observation::{ElementObserver, PropertyObserver, SetterObserver, Subscriber};

fn configs() -> [BindingConfig; 2] {
    [
        BindingConfig::default(),
        BindingConfig::default().with_chain_optimization(false),
    ]
}

// ============================================================================
// Re-binding
// ============================================================================

#[test]
fn rebind_to_same_scope_restores_first_bind_state() {
    for config in configs() {
        let user = ObjectRef::new().with("name", "Ann");
        let fx = Fixture::new(ObjectRef::new().with("user", user.clone())).with_config(config);
        let binding = fx.binding(Expression::path("user.name"), BindingMode::ToView);

        fx.bind(&binding).unwrap();
        let first = fx.target_value();
        let subscribers = SetterObserver::for_property(&user, "name").subscriber_count();

        binding.unbind(LifecycleFlags::NONE).unwrap();
        fx.bind(&binding).unwrap();

        assert_eq!(fx.target_value(), first);
        assert_eq!(fx.vm.get("user"), Value::from(user.clone()));
        assert_eq!(
            SetterObserver::for_property(&user, "name").subscriber_count(),
            subscribers,
            "re-bind must not stack subscriptions"
        );
    }
}

#[test]
fn bind_twice_to_same_scope_is_a_noop() {
    let fx = Fixture::new(ObjectRef::new().with("name", "Ann"));
    let binding = fx.binding(Expression::path("name"), BindingMode::ToView);
    fx.bind(&binding).unwrap();
    let writes = fx.locator.write_count();
    fx.bind(&binding).unwrap();
    assert_eq!(fx.locator.write_count(), writes);
    assert_eq!(
        SetterObserver::for_property(&fx.vm, "name").subscriber_count(),
        1
    );
}

#[test]
fn target_observer_is_reused_across_binds() {
    let fx = Fixture::new(ObjectRef::new().with("name", "Ann"));
    let binding = fx.binding(Expression::path("name"), BindingMode::TwoWay);
    fx.bind(&binding).unwrap();
    let first = binding.target_observer().unwrap();
    binding.unbind(LifecycleFlags::NONE).unwrap();
    fx.bind(&binding).unwrap();
    let second = binding.target_observer().unwrap();
    let (first, second) = (first.as_observer().unwrap(), second.as_observer().unwrap());
    assert!(Rc::ptr_eq(first, second));
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn unbind_removes_every_subscription() {
    for config in configs() {
        let user = ObjectRef::new().with("name", "Ann");
        let fx = Fixture::new(ObjectRef::new().with("user", user.clone())).with_config(config);
        let binding = fx.binding(Expression::path("user.name"), BindingMode::ToView);
        fx.bind(&binding).unwrap();
        binding.unbind(LifecycleFlags::NONE).unwrap();

        assert_eq!(binding.state(), BindingState::Unbound);
        assert!(binding.scope().is_none());
        assert_eq!(binding.observer_slots(), 0);
        assert_eq!(binding.chain_len(), 0);
        assert_eq!(SetterObserver::for_property(&fx.vm, "user").subscriber_count(), 0);
        assert_eq!(SetterObserver::for_property(&user, "name").subscriber_count(), 0);

        fx.locator.clear_writes();
        user.set("name", "Bea").unwrap();
        fx.vm.set("user", ObjectRef::new().with("name", "Cid")).unwrap();
        assert_eq!(fx.locator.write_count(), 0);
        assert_eq!(fx.target_value(), Value::from("Ann"));
    }
}

#[test]
fn unbind_detaches_from_view_target() {
    let fx = Fixture::new(ObjectRef::new().with("name", "Ann"));
    let binding = fx.binding(Expression::path("name"), BindingMode::TwoWay);
    fx.bind(&binding).unwrap();
    let element = ElementObserver::for_property(&fx.target, "value");
    assert!(element.is_listening());
    assert_eq!(element.subscriber_count(), 1);

    binding.unbind(LifecycleFlags::NONE).unwrap();
    assert!(!element.is_listening());
    assert_eq!(element.subscriber_count(), 0);

    fx.target.dispatch_input("value", "typed").unwrap();
    assert_eq!(fx.vm.get("name"), Value::from("Ann"));
}

#[test]
fn unbind_before_bind_is_a_noop() {
    let fx = Fixture::new(ObjectRef::new());
    let binding = fx.binding(Expression::path("name"), BindingMode::ToView);
    binding.unbind(LifecycleFlags::NONE).unwrap();
    assert_eq!(binding.state(), BindingState::Unbound);
    assert!(binding.target_observer().is_none());
}

#[test]
fn binding_to_new_scope_drops_old_dependencies() {
    let fx = Fixture::new(ObjectRef::new().with("name", "Ann"));
    let binding = fx.binding(Expression::path("name"), BindingMode::ToView);
    fx.bind(&binding).unwrap();

    let other = ObjectRef::new().with("name", "Zed");
    binding
        .bind(LifecycleFlags::FROM_BIND, &Scope::create(other.clone()), None)
        .unwrap();
    assert_eq!(fx.target_value(), Value::from("Zed"));
    assert_eq!(SetterObserver::for_property(&fx.vm, "name").subscriber_count(), 0);

    fx.vm.set("name", "Bea").unwrap();
    assert_eq!(fx.target_value(), Value::from("Zed"));
    other.set("name", "Yan").unwrap();
    assert_eq!(fx.target_value(), Value::from("Yan"));
}

/// Unbinds the binding the first time the watched property changes.
struct UnbindOnChange {
    binding: RefCell<Option<Weak<PropertyBinding>>>,
}

impl Subscriber for UnbindOnChange {
    fn handle_change(&self, _: &Value, _: &Value, _: LifecycleFlags) -> Result<()> {
        let binding = self.binding.borrow_mut().take();
        match binding.and_then(|weak| weak.upgrade()) {
            Some(binding) => binding.unbind(LifecycleFlags::NONE),
            None => Ok(()),
        }
    }
}

#[test]
fn unbind_from_target_write_leaves_no_subscriptions() {
    let user = ObjectRef::new().with("name", "Ann");
    let fx = Fixture::new(ObjectRef::new().with("user", user.clone()));
    let target = ObjectRef::new();
    let binding = PropertyBinding::with_strategy(
        Expression::path("user.name"),
        &target,
        "value",
        BindingMode::ToView,
        EvaluationStrategy::FullExpression,
        fx.locator.clone(),
        fx.resources.clone(),
    );
    fx.bind(&binding).unwrap();
    assert_eq!(binding.observer_slots(), 2);

    let unbinder = Rc::new(UnbindOnChange {
        binding: RefCell::new(Some(binding.downgrade())),
    });
    SetterObserver::for_property(&target, "value").subscribe(unbinder.clone());

    user.set("name", "Bea").unwrap();

    assert_eq!(target.get("value"), Value::from("Bea"));
    assert_eq!(binding.state(), BindingState::Unbound);
    assert_eq!(binding.observer_slots(), 0);
    assert_eq!(SetterObserver::for_property(&fx.vm, "user").subscriber_count(), 0);
    assert_eq!(SetterObserver::for_property(&user, "name").subscriber_count(), 0);

    user.set("name", "Cid").unwrap();
    assert_eq!(target.get("value"), Value::from("Bea"));
}

#[test]
fn dropped_binding_stops_updating_its_target() {
    for config in configs() {
        let user = ObjectRef::new().with("name", "Ann");
        let fx = Fixture::new(ObjectRef::new().with("user", user.clone())).with_config(config);
        let binding = fx.binding(Expression::path("user.name"), BindingMode::ToView);
        fx.bind(&binding).unwrap();
        let weak = Rc::downgrade(&binding);
        drop(binding);

        assert!(weak.upgrade().is_none());
        fx.vm.set("user", ObjectRef::new().with("name", "Zed")).unwrap();
        assert_eq!(fx.target_value(), Value::from("Ann"));
        assert_eq!(SetterObserver::for_property(&user, "name").subscriber_count(), 0);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn notification_without_direction_is_fatal() {
    let fx = Fixture::new(ObjectRef::new().with("a", 1));
    let binding = fx.binding(
        Expression::binary(BinaryOperator::Add, Expression::scope("a"), Expression::primitive(1)),
        BindingMode::ToView,
    );
    fx.bind(&binding).unwrap();
    let err = tether_runtime::Subscriber::handle_change(
        binding.as_ref(),
        &Value::from(3),
        &Value::from(1),
        LifecycleFlags::FROM_BIND,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        BindingError::MissingDirection { binding: id, .. } if id == binding.id()
    ));
}

#[test]
fn non_member_node_in_chain_is_fatal_and_rolls_back() {
    let fx = Fixture::new(ObjectRef::new().with("a", 1));
    let binding = PropertyBinding::with_strategy(
        Expression::binary(BinaryOperator::Add, Expression::scope("a"), Expression::primitive(1)),
        &fx.target,
        "value",
        BindingMode::ToView,
        EvaluationStrategy::ObserverChain,
        fx.locator.clone(),
        fx.resources.clone(),
    );
    let err = fx.bind(&binding).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid expression leaked into optimized mode: Binary"
    );
    assert_eq!(binding.state(), BindingState::Unbound);
    assert!(binding.scope().is_none());
    assert!(binding.persistent_flags().is_empty());
}

#[test]
fn missing_converter_rolls_back_bind() {
    let fx = Fixture::new(ObjectRef::new().with("name", "Ann"));
    let binding = fx.binding(
        Expression::path("name").convert("shout", vec![]),
        BindingMode::TwoWay,
    );
    let err = fx.bind(&binding).unwrap_err();
    assert_eq!(err, BindingError::ValueConverterNotFound("shout".into()));
    assert_eq!(binding.state(), BindingState::Unbound);
    assert_eq!(binding.observer_slots(), 0);
    assert!(!ElementObserver::for_property(&fx.target, "value").is_listening());
    assert_eq!(
        ElementObserver::for_property(&fx.target, "value").subscriber_count(),
        0
    );
}

#[test]
fn ids_are_unique() {
    let fx = Fixture::new(ObjectRef::new());
    let a = fx.binding(Expression::path("a"), BindingMode::ToView);
    let b = fx.binding(Expression::path("a"), BindingMode::ToView);
    assert!(b.id() > a.id());
}
