#![no_main]

//! Random graph mutations under a member-chain binding: the observer-chain
//! and full-expression strategies must keep the target identical.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{BindingMode, LifecycleFlags, ObjectRef, Value};
use tether_harness::Fixture;
use tether_runtime::ast::Expression;
use tether_runtime::config::BindingConfig;

const SEGMENTS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Arbitrary)]
enum Leaf {
    Undefined,
    Null,
    Bool(bool),
    Int(i16),
    Text(u8),
}

impl From<&Leaf> for Value {
    fn from(leaf: &Leaf) -> Self {
        match leaf {
            Leaf::Undefined => Value::Undefined,
            Leaf::Null => Value::Null,
            Leaf::Bool(b) => Value::from(*b),
            Leaf::Int(n) => Value::from(i32::from(*n)),
            Leaf::Text(n) => Value::from(format!("t{}", n % 8)),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Set { depth: u8, value: Leaf, object: bool },
    Rebind,
}

#[derive(Debug, Arbitrary)]
struct Input {
    depth: u8,
    ops: Vec<Op>,
}

fn graph(segments: &[&str], leaf: Value) -> Value {
    segments
        .iter()
        .rev()
        .fold(leaf, |value, segment| Value::from(ObjectRef::new().with(segment, value)))
}

fn holder(root: &ObjectRef, segments: &[&str]) -> Option<ObjectRef> {
    let mut current = root.clone();
    for segment in segments {
        current = current.get(segment).as_object()?.clone();
    }
    Some(current)
}

fuzz_target!(|input: Input| {
    let len = usize::from(input.depth % 4) + 1;
    let path = &SEGMENTS[..len];
    let Some(root) = graph(path, Value::from("leaf")).as_object().cloned() else {
        return;
    };

    let chain_fx = Fixture::new(root.clone());
    let full_fx = Fixture::new(root.clone())
        .with_config(BindingConfig::default().with_chain_optimization(false));
    let expr = Expression::path(&path.join("."));
    let chain = chain_fx.binding(expr.clone(), BindingMode::ToView);
    let full = full_fx.binding(expr, BindingMode::ToView);
    if chain_fx.bind(&chain).is_err() || full_fx.bind(&full).is_err() {
        return;
    }

    for op in input.ops.iter().take(64) {
        match op {
            Op::Set { depth, value, object } => {
                let depth = usize::from(*depth) % len;
                let Some(target) = holder(&root, &path[..depth]) else {
                    continue;
                };
                let value = if *object {
                    graph(&path[depth + 1..], Value::from(value))
                } else {
                    Value::from(value)
                };
                let _ = target.set(path[depth], value);
            }
            Op::Rebind => {
                let _ = chain.unbind(LifecycleFlags::NONE);
                let _ = full.unbind(LifecycleFlags::NONE);
                assert_eq!(chain.observer_slots() + chain.chain_len(), 0);
                assert_eq!(full.observer_slots() + full.chain_len(), 0);
                let _ = chain_fx.bind(&chain);
                let _ = full_fx.bind(&full);
            }
        }
        assert_eq!(chain_fx.target_value(), full_fx.target_value());
        assert!(chain.chain_len() <= len);
    }
});
