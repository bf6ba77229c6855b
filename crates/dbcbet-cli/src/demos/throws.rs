//! Allowed-exception narrowing: a base type, a subtype that narrows the
//! allowed set, and a sub-subtype that inherits the narrowed set.

use dbcbet_check::{CallError, ContractRegistry, Domain, FinitizationRegistry, OperationDecl};
use dbcbet_core::ExceptionId;

use super::{integer, Setup, SetupError};

#[derive(Clone, Copy)]
struct Categories {
    good: ExceptionId,
    bad: ExceptionId,
    another_good: ExceptionId,
    different_good: ExceptionId,
}

fn do_something(cats: Categories) -> OperationDecl {
    OperationDecl::method("do_something", 1, move |_, _, a| {
        let class = match integer(&a[0])? {
            1 => cats.good,
            2 => cats.another_good,
            3 => cats.different_good,
            _ => cats.bad,
        };
        Err(CallError::raise(class, format!("do_something({})", a[0])))
    })
}

pub fn setup() -> Result<Setup, SetupError> {
    let mut reg = ContractRegistry::new();
    let good = reg.declare_exception("GoodException", ExceptionId::EXCEPTION)?;
    let cats = Categories {
        good,
        bad: reg.declare_exception("BadException", ExceptionId::EXCEPTION)?,
        another_good: reg.declare_exception("AnotherGoodException", good)?,
        different_good: reg.declare_exception("ADifferentGoodException", ExceptionId::EXCEPTION)?,
    };

    let base = reg.declare_type("ThrowsTestClass", &[])?;
    let sub = reg.declare_type("ThrowsTestSubClass", &[base])?;
    let sub_sub = reg.declare_type("ThrowsTestSubSubClass", &[sub])?;

    let base_op = reg.declare_operation(base, do_something(cats))?;
    let sub_op = reg.declare_operation(sub, do_something(cats))?;
    let sub_sub_op = reg.declare_operation(sub_sub, do_something(cats))?;

    reg.add_allowed_exceptions(base_op, &[cats.different_good, cats.good])?;
    reg.add_allowed_exceptions(sub_op, &[cats.another_good])?;
    reg.compose_all()?;

    // An allowed exception escaping a run is fatal, so each domain holds
    // only arguments whose exception the type does not allow.
    let mut fin = FinitizationRegistry::new();
    fin.attach_arguments(base_op, vec![Domain::ints([4])]);
    fin.attach_arguments(sub_op, vec![Domain::ints([1, 3, 4])]);
    fin.attach_arguments(sub_sub_op, vec![Domain::ints([1, 3, 4])]);

    Ok(Setup {
        registry: reg,
        finitizations: fin,
        targets: vec![base, sub, sub_sub],
    })
}
