#![no_main]

//! Interleaved user input and source writes on a two-way binding must
//! converge: after every step source and target hold the same value.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::{BindingMode, ObjectRef, Value};
use tether_harness::Fixture;
use tether_runtime::ast::Expression;

#[derive(Debug, Arbitrary)]
enum Step {
    Type(u8),
    Assign(u8),
    Clear,
}

fuzz_target!(|steps: Vec<Step>| {
    let fx = Fixture::new(ObjectRef::new().with("form", ObjectRef::new()));
    let binding = fx.binding(Expression::path("form.name"), BindingMode::TwoWay);
    if fx.bind(&binding).is_err() {
        return;
    }

    for step in steps.iter().take(128) {
        let form = match fx.vm.get("form").as_object() {
            Some(form) => form.clone(),
            None => return,
        };
        match step {
            Step::Type(n) => {
                let _ = fx.target.dispatch_input("value", format!("v{}", n % 16).as_str());
            }
            Step::Assign(n) => {
                let _ = form.set("name", format!("v{}", n % 16).as_str());
            }
            Step::Clear => {
                let _ = form.set("name", Value::Undefined);
            }
        }
        assert_eq!(form.get("name"), fx.target_value());
    }
});
