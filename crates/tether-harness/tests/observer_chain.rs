#![forbid(unsafe_code)]

//! Integration tests: observer-chain strategy on member chains.

use std::rc::Rc;

use tether_core::{BindingMode, ObjectRef, Value};
use tether_harness::Fixture;
use tether_runtime::ast::Expression;
use tether_runtime::binding::EvaluationStrategy;
use tether_runtime::observation::{PropertyObserver, SetterObserver};

fn user(name: &str) -> ObjectRef {
    ObjectRef::new().with("name", name)
}

#[test]
fn user_name_scenario() {
    let ann = user("Ann");
    let fx = Fixture::new(ObjectRef::new().with("user", ann.clone()));
    let binding = fx.binding(Expression::path("user.name"), BindingMode::ToView);
    assert_eq!(binding.strategy(), EvaluationStrategy::ObserverChain);

    fx.bind(&binding).unwrap();
    assert_eq!(fx.target_value(), Value::from("Ann"));

    ann.set("name", "Bea").unwrap();
    assert_eq!(fx.target_value(), Value::from("Bea"));

    fx.vm.set("user", user("Cid")).unwrap();
    assert_eq!(fx.target_value(), Value::from("Cid"));
    assert_eq!(
        SetterObserver::for_property(&ann, "name").subscriber_count(),
        0,
        "old user's name observer must be released"
    );
    assert_eq!(
        fx.locator.written_values(),
        [Value::from("Ann"), Value::from("Bea"), Value::from("Cid")]
    );
}

#[test]
fn swapping_intermediate_object_moves_leaf_subscription() {
    let old_b = ObjectRef::new().with("c", 1);
    let a = ObjectRef::new().with("b", old_b.clone());
    let fx = Fixture::new(ObjectRef::new().with("a", a.clone()));
    let binding = fx.binding(Expression::path("a.b.c"), BindingMode::ToView);
    fx.bind(&binding).unwrap();
    let before = binding.chain_subscribers();

    let new_b = ObjectRef::new().with("c", 2);
    a.set("b", new_b.clone()).unwrap();

    assert_eq!(SetterObserver::for_property(&old_b, "c").subscriber_count(), 0);
    assert_eq!(SetterObserver::for_property(&new_b, "c").subscriber_count(), 1);
    assert!(before[2].is_disposed());
    assert_eq!(fx.target_value(), Value::from(2));

    new_b.set("c", 3).unwrap();
    assert_eq!(fx.target_value(), Value::from(3));
    old_b.set("c", 99).unwrap();
    assert_eq!(fx.target_value(), Value::from(3));
}

#[test]
fn leaf_change_never_rebuilds_upper_positions() {
    let b = ObjectRef::new().with("c", 1);
    let a = ObjectRef::new().with("b", b.clone());
    let fx = Fixture::new(ObjectRef::new().with("a", a));
    let binding = fx.binding(Expression::path("a.b.c"), BindingMode::ToView);
    fx.bind(&binding).unwrap();
    let before = binding.chain_subscribers();
    let requests = fx.locator.observer_requests();

    for n in 2..6 {
        b.set("c", n).unwrap();
        assert_eq!(fx.target_value(), Value::from(n));
    }

    assert_eq!(fx.locator.observer_requests(), requests);
    let after = binding.chain_subscribers();
    assert_eq!(after.len(), 3);
    assert!(before.iter().zip(&after).all(|(x, y)| Rc::ptr_eq(x, y)));
}

#[test]
fn chain_shrinks_and_grows_with_the_graph() {
    let a = ObjectRef::new().with("b", ObjectRef::new().with("c", "deep"));
    let fx = Fixture::new(ObjectRef::new().with("a", a.clone()));
    let binding = fx.binding(Expression::path("a.b.c"), BindingMode::ToView);
    fx.bind(&binding).unwrap();
    assert_eq!(binding.chain_len(), 3);

    a.set("b", Value::Null).unwrap();
    assert_eq!(binding.chain_len(), 2);
    assert!(fx.target_value().is_undefined());
    assert!(binding.chain_subscribers().iter().all(|s| !s.is_leaf()));

    a.set("b", ObjectRef::new().with("c", "back")).unwrap();
    assert_eq!(binding.chain_len(), 3);
    assert_eq!(fx.target_value(), Value::from("back"));
}

#[test]
fn at_most_one_subscription_per_position() {
    let a = ObjectRef::new().with("b", ObjectRef::new().with("c", 0));
    let fx = Fixture::new(ObjectRef::new().with("a", a.clone()));
    let binding = fx.binding(Expression::path("a.b.c"), BindingMode::ToView);
    fx.bind(&binding).unwrap();

    for n in 0..5 {
        a.set("b", ObjectRef::new().with("c", n + 10)).unwrap();
        fx.vm.set("a", a.clone()).unwrap();
    }
    assert_eq!(binding.chain_len(), 3);
    assert_eq!(SetterObserver::for_property(&fx.vm, "a").subscriber_count(), 1);
    assert_eq!(SetterObserver::for_property(&a, "b").subscriber_count(), 1);
    assert_eq!(fx.target_value(), Value::from(14));
}

#[test]
fn parent_scope_roots_resolve_through_ancestors() {
    let fx = Fixture::new(ObjectRef::new().with("title", "Inbox"));
    let child = tether_core::Scope::from_parent(&fx.scope, ObjectRef::new().with("item", 1));
    let binding = fx.binding(Expression::path("$parent.title"), BindingMode::ToView);
    binding
        .bind(tether_core::LifecycleFlags::FROM_BIND, &child, None)
        .unwrap();
    assert_eq!(fx.target_value(), Value::from("Inbox"));
    fx.vm.set("title", "Sent").unwrap();
    assert_eq!(fx.target_value(), Value::from("Sent"));
}
