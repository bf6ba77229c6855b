//! The introductory example: one type, one operation.

use dbcbet_check::contracts::adapters::{args, returns};
use dbcbet_check::{
    ContractRegistry, Domain, FinitizationRegistry, Invariant, OperationDecl, Postcondition,
    Precondition,
};
use dbcbet_core::Value;

use super::{integer, Setup, SetupError};

fn ints(a: &[Value]) -> Option<(i64, i64)> {
    Some((a.first()?.as_int()?, a.get(1)?.as_int()?))
}

pub fn setup() -> Result<Setup, SetupError> {
    let mut reg = ContractRegistry::new();
    let ty = reg.declare_type("ExampleClass", &[])?;
    reg.declare_operation(
        ty,
        OperationDecl::constructor(0, |_, inst, _| {
            inst.set("x", 0);
            Ok(Value::Null)
        }),
    )?;
    let op = reg.declare_operation(
        ty,
        OperationDecl::method("do_something", 2, |_, inst, a| {
            let (a1, a2) = (integer(&a[0])?, integer(&a[1])?);
            inst.set("x", a1 - a2);
            Ok(Value::Int(a1 + a2))
        }),
    )?;

    reg.add_invariant(
        ty,
        Invariant::new("x_non_negative", |s| s.get_int("x").is_some_and(|x| x >= 0)),
    )?;
    reg.add_precondition(
        op,
        args("both_numbers_positive", |a| {
            ints(a).is_some_and(|(a1, a2)| a1 > 0 && a2 > 0)
        }),
    )?;
    reg.add_precondition(
        op,
        Precondition::new("first_greater_than_second", |_, a| {
            ints(a).is_some_and(|(a1, a2)| a1 > a2)
        }),
    )?;
    reg.add_postcondition(
        op,
        Postcondition::new("set_x", |s, _, _, a| {
            ints(a).is_some_and(|(a1, a2)| s.get_int("x") == Some(a1 - a2))
        }),
    )?;
    reg.add_postcondition(
        op,
        Postcondition::new("returned_the_sum", |_, _, r, a| {
            ints(a).is_some_and(|(a1, a2)| r.as_int() == Some(a1 + a2))
        }),
    )?;
    reg.add_postcondition(op, returns("returned_an_int", |r| r.as_int().is_some()))?;
    reg.compose_all()?;

    let mut fin = FinitizationRegistry::new();
    fin.attach_fields(ty, [("x", Domain::ints(-1..3))]);
    fin.attach_arguments(op, vec![Domain::ints(-1..4), Domain::ints(-1..3)]);

    Ok(Setup {
        registry: reg,
        finitizations: fin,
        targets: vec![ty],
    })
}
