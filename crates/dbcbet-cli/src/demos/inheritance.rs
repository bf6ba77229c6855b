//! A base type and a subtype overriding `a_method`, each with its own
//! invariant, precondition and postconditions.

use dbcbet_check::{
    ContractRegistry, Domain, FinitizationRegistry, Invariant, OperationDecl, Postcondition,
    Precondition,
};
use dbcbet_core::{Instance, Value};

use super::{integer, Setup, SetupError};

fn a_is_not(n: i64) -> impl Fn(&Instance, &[Value]) -> bool + Send + Sync {
    move |_, a| a[0].as_int() != Some(n)
}

fn post_a_is_not(
    n: i64,
) -> impl Fn(&Instance, &dbcbet_check::Snapshot, &Value, &[Value]) -> bool + Send + Sync {
    move |_, _, _, a| a[0].as_int() != Some(n)
}

/// Holds while `x` is unset.
fn x_is_not(n: i64) -> impl Fn(&Instance) -> bool + Send + Sync {
    move |s| !s.has("x") || s.get_int("x") != Some(n)
}

pub fn setup() -> Result<Setup, SetupError> {
    let mut reg = ContractRegistry::new();
    let base = reg.declare_type("TestBaseClass", &[])?;
    let sub = reg.declare_type("TestSubClass", &[base])?;

    let base_op = reg.declare_operation(
        base,
        OperationDecl::method("a_method", 1, |_, inst, a| {
            inst.set("x", integer(&a[0])?);
            Ok(Value::Null)
        }),
    )?;
    let sub_op = reg.declare_operation(
        sub,
        OperationDecl::method("a_method", 1, |_, inst, a| {
            inst.set("x", integer(&a[0])? + 1);
            Ok(Value::Null)
        }),
    )?;

    reg.add_invariant(base, Invariant::new("base_class_inv", x_is_not(1)))?;
    reg.add_precondition(base_op, Precondition::new("base_class_method_pre", a_is_not(3)))?;
    reg.add_postcondition(
        base_op,
        Postcondition::new("base_class_method_post", post_a_is_not(5)),
    )?;

    reg.add_invariant(sub, Invariant::new("sub_class_inv", x_is_not(2)))?;
    reg.add_precondition(sub_op, Precondition::new("sub_class_method_pre", a_is_not(4)))?;
    reg.add_precondition(sub_op, Precondition::new("sub_class_method_pre2", a_is_not(7)))?;
    reg.add_postcondition(
        sub_op,
        Postcondition::new("sub_class_method_post", post_a_is_not(6)),
    )?;
    reg.add_postcondition(
        sub_op,
        Postcondition::new("sub_class_method_post2", post_a_is_not(8)),
    )?;
    reg.compose_all()?;

    let mut fin = FinitizationRegistry::new();
    fin.attach_arguments(base_op, vec![Domain::ints(-1..10)]);
    fin.attach_arguments(sub_op, vec![Domain::ints(-1..10)]);

    Ok(Setup {
        registry: reg,
        finitizations: fin,
        targets: vec![base, sub],
    })
}
