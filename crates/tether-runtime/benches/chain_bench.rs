//! Benchmarks for change propagation through member chains.
//!
//! Run with: `cargo bench --package tether-runtime --bench chain_bench`
//!
//! Compares the two evaluation strategies on `p0.p1...pN`:
//!
//! | Group | Change | Chain strategy | Full strategy |
//! |-------|--------|----------------|---------------|
//! | `leaf_write` | leaf value | direct push | re-evaluate + re-connect |
//! | `root_swap` | root object | rebuild whole chain | re-evaluate + re-connect |
//!
//! Results are written to `target/criterion/chain_bench/`.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tether_core::{BindingMode, LifecycleFlags, ObjectRef, Scope, Value};
use tether_runtime::ast::Expression;
use tether_runtime::binding::{EvaluationStrategy, PropertyBinding};
use tether_runtime::observation::DefaultObserverLocator;
use tether_runtime::resources::ResourceRegistry;

// ============================================================================
// Fixtures
// ============================================================================

fn path(depth: usize) -> String {
    (0..depth)
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join(".")
}

/// A nested object `p1.p2...` below the root, returning it plus the holder
/// of the leaf property.
fn nested(depth: usize, leaf: i32) -> (ObjectRef, ObjectRef) {
    let holder = ObjectRef::new().with(&format!("p{}", depth - 1), leaf);
    let mut node = holder.clone();
    for i in (1..depth - 1).rev() {
        node = ObjectRef::new().with(&format!("p{i}"), node);
    }
    (node, holder)
}

struct Fixture {
    vm: ObjectRef,
    leaf_holder: ObjectRef,
    leaf_name: String,
    _binding: Rc<PropertyBinding>,
}

fn fixture(depth: usize, strategy: EvaluationStrategy) -> Fixture {
    let (first, leaf_holder) = nested(depth, 0);
    let vm = ObjectRef::new().with("p0", first);
    let target = ObjectRef::element("span");
    let binding = PropertyBinding::with_strategy(
        Expression::path(&path(depth)),
        &target,
        "textContent",
        BindingMode::ToView,
        strategy,
        Rc::new(DefaultObserverLocator::new()),
        Rc::new(ResourceRegistry::new()),
    );
    binding
        .bind(LifecycleFlags::FROM_BIND, &Scope::create(vm.clone()), None)
        .expect("bind");
    Fixture {
        vm,
        leaf_holder,
        leaf_name: format!("p{}", depth - 1),
        _binding: binding,
    }
}

const STRATEGIES: [(&str, EvaluationStrategy); 2] = [
    ("chain", EvaluationStrategy::ObserverChain),
    ("full", EvaluationStrategy::FullExpression),
];

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_leaf_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_bench/leaf_write");
    for depth in [2, 4, 8] {
        for (name, strategy) in STRATEGIES {
            let fx = fixture(depth, strategy);
            let mut n = 0;
            group.bench_with_input(BenchmarkId::new(name, depth), &depth, |b, _| {
                b.iter(|| {
                    n += 1;
                    fx.leaf_holder
                        .set(&fx.leaf_name, black_box(Value::from(n)))
                        .expect("set");
                });
            });
        }
    }
    group.finish();
}

fn bench_root_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_bench/root_swap");
    for depth in [2, 4, 8] {
        for (name, strategy) in STRATEGIES {
            let fx = fixture(depth, strategy);
            let roots = [nested(depth, 1).0, nested(depth, 2).0];
            let mut flip = 0;
            group.bench_with_input(BenchmarkId::new(name, depth), &depth, |b, _| {
                b.iter(|| {
                    flip ^= 1;
                    fx.vm
                        .set("p0", black_box(roots[flip].clone()))
                        .expect("set");
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_leaf_write, bench_root_swap);
criterion_main!(benches);
