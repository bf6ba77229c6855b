//! End-to-end scenarios for the checked-call protocol and the BET driver.
//!
//! The central fixture is `ExampleClass`: invariant `x >= 0`, field
//! finitization `x in {-1, 0, 1, 2}`, and `do_something(a1, a2)` with
//! preconditions `a1 > 0 && a2 > 0` and `a1 > a2`, postconditions
//! `x == a1 - a2` and `return == a1 + a2`.

use dbcbet_check::contracts::adapters::{args, returns};
use dbcbet_check::{
    Bet, CallError, ContractKind, ContractRegistry, Domain, FinitizationRegistry, Invariant,
    LogEntry, OperationDecl, Postcondition, Precondition,
};
use dbcbet_core::{OperationId, TypeId, Value};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

struct Example {
    reg: ContractRegistry,
    fin: FinitizationRegistry,
    ty: TypeId,
    op: OperationId,
}

fn int(v: &Value) -> i64 {
    v.as_int().unwrap()
}

/// Builds the example fixture. `returned` computes the return value from
/// `(a1, a2)` so tests can plant a bug.
fn example(returned: fn(i64, i64) -> i64) -> Example {
    let mut reg = ContractRegistry::new();
    let ty = reg.declare_type("ExampleClass", &[]).unwrap();
    reg.declare_operation(
        ty,
        OperationDecl::constructor(0, |_, inst, _| {
            inst.set("x", 0);
            Ok(Value::Null)
        }),
    )
    .unwrap();
    let op = reg
        .declare_operation(
            ty,
            OperationDecl::method("do_something", 2, move |_, inst, a| {
                let (a1, a2) = (int(&a[0]), int(&a[1]));
                inst.set("x", a1 - a2);
                Ok(Value::Int(returned(a1, a2)))
            }),
        )
        .unwrap();

    reg.add_invariant(
        ty,
        Invariant::new("x_non_negative", |s| s.get_int("x").is_some_and(|x| x >= 0)),
    )
    .unwrap();
    reg.add_precondition(
        op,
        args("both_numbers_positive", |a| int(&a[0]) > 0 && int(&a[1]) > 0),
    )
    .unwrap();
    reg.add_precondition(
        op,
        Precondition::new("first_greater_than_second", |_, a| int(&a[0]) > int(&a[1])),
    )
    .unwrap();
    reg.add_postcondition(
        op,
        Postcondition::new("set_x", |s, _, _, a| s.get_int("x") == Some(int(&a[0]) - int(&a[1]))),
    )
    .unwrap();
    reg.add_postcondition(
        op,
        Postcondition::new("returned_the_sum", |_, _, r, a| {
            r.as_int() == Some(int(&a[0]) + int(&a[1]))
        }),
    )
    .unwrap();
    reg.compose_all().unwrap();

    let mut fin = FinitizationRegistry::new();
    fin.attach_fields(ty, [("x", Domain::ints(-1..3))]);
    fin.attach_arguments(op, vec![Domain::ints(-1..4), Domain::ints(-1..3)]);

    Example { reg, fin, ty, op }
}

fn sum(a1: i64, a2: i64) -> i64 {
    a1 + a2
}

// ---------------------------------------------------------------------------
// Bounded-exhaustive run
// ---------------------------------------------------------------------------

#[test]
fn example_run_counts() {
    let ex = example(sum);
    let invoice = Bet::new(&ex.reg, &ex.fin).run(ex.ty).unwrap();

    assert_eq!(invoice.type_name, "ExampleClass");
    assert_eq!(invoice.invariant_violations, 1);
    assert_eq!(invoice.candidates, 3);
    assert_eq!(invoice.call_candidates, 60);
    assert_eq!(invoice.precondition_violations, 51);
    assert_eq!(invoice.successes, 9);
    assert_eq!(invoice.failures, 0);
    assert!(invoice.log.is_empty());
    assert!(!invoice.has_failures());
}

#[test]
fn example_run_is_reproducible() {
    let ex = example(sum);
    let first = Bet::new(&ex.reg, &ex.fin).run(ex.ty).unwrap();
    let second = Bet::new(&ex.reg, &ex.fin).run(ex.ty).unwrap();
    assert_eq!(first, second);
}

#[test]
fn planted_bug_is_logged_per_call() {
    // Wrong result whenever a1 == 3.
    let ex = example(|a1, a2| if a1 == 3 { 0 } else { a1 + a2 });
    let invoice = Bet::new(&ex.reg, &ex.fin).run(ex.ty).unwrap();

    assert_eq!(invoice.successes, 3);
    assert_eq!(invoice.failures, 6);
    assert_eq!(invoice.failure_kinds.postcondition, 6);
    assert_eq!(invoice.failure_descriptions().len(), 6);
    assert_eq!(
        invoice.failure_descriptions()[0],
        "instance of ExampleClass with initialization {x: 0} failed when calling do_something \
         with arguments 3, 1. Reason: Postcondition Violation: Instance of ExampleClass failed \
         when calling do_something with arguments (3, 1), old values: \
         old(self=ExampleClass{x: 1}, args=[3, 1]), return: 0. Contract: returned_the_sum"
    );
    match &invoice.log[0] {
        LogEntry::Failure { kind, arguments, .. } => {
            assert_eq!(*kind, ContractKind::Postcondition);
            assert_eq!(arguments, &vec![Value::Int(3), Value::Int(1)]);
        }
        other => panic!("expected failure entry, got {other:?}"),
    }
}

#[test]
fn argument_scope_bounds_every_operation_enumeration() {
    let ex = example(sum);
    // The first 8 combinations have a2 in {-1, 0}: all rejected.
    let invoice = Bet::new(&ex.reg, &ex.fin)
        .with_argument_scope(8)
        .run(ex.ty)
        .unwrap();
    assert_eq!(invoice.call_candidates, 24);
    assert_eq!(invoice.precondition_violations, 24);
    assert_eq!(invoice.successes, 0);
}

// ---------------------------------------------------------------------------
// Explicit checked calls
// ---------------------------------------------------------------------------

#[test]
fn accepted_call_updates_state_and_returns_sum() {
    let ex = example(sum);
    for x in 0..3 {
        let mut inst = ex.reg.construct(ex.ty, &[]).unwrap();
        inst.set("x", x);
        let ret = ex
            .reg
            .call(&mut inst, "do_something", &[Value::Int(2), Value::Int(1)])
            .unwrap();
        assert_eq!(ret, Value::Int(3));
        assert_eq!(inst.get_int("x"), Some(1));
    }
}

#[test]
fn rejected_call_reports_failed_predicate_and_does_not_mutate() {
    let ex = example(sum);
    let mut inst = ex.reg.construct(ex.ty, &[]).unwrap();
    inst.set("x", 2);

    let err = ex
        .reg
        .invoke(ex.op, &mut inst, &[Value::Int(1), Value::Int(2)])
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(
        err.to_string(),
        "Precondition Violation: Instance of ExampleClass failed when calling do_something \
         with arguments (1, 2). Contract: first_greater_than_second"
    );
    assert_eq!(inst.get_int("x"), Some(2));
}

#[test]
fn invariant_is_checked_after_construction() {
    let mut reg = ContractRegistry::new();
    let ty = reg.declare_type("Negative", &[]).unwrap();
    reg.declare_operation(
        ty,
        OperationDecl::constructor(0, |_, inst, _| {
            inst.set("x", -1);
            Ok(Value::Null)
        }),
    )
    .unwrap();
    reg.add_invariant(ty, Invariant::new("x_non_negative", |s| s.get_int("x") >= Some(0)))
        .unwrap();

    let err = reg.construct(ty, &[]).unwrap_err();
    let violation = err.violation().unwrap();
    assert_eq!(violation.kind(), ContractKind::Invariant);
    assert_eq!(violation.operation().operation, "init");
}

#[test]
fn postcondition_sees_pre_call_state() {
    let mut reg = ContractRegistry::new();
    let ty = reg.declare_type("Counter", &[]).unwrap();
    reg.declare_field(ty, "n", 0).unwrap();
    let inc = reg
        .declare_operation(
            ty,
            OperationDecl::method("inc", 0, |_, inst, _| {
                let n = inst.get_int("n").unwrap_or(0);
                inst.set("n", n + 1);
                Ok(Value::Int(n + 1))
            }),
        )
        .unwrap();
    reg.add_postcondition(
        inc,
        Postcondition::new("n grew by one", |s, old, _, _| {
            s.get_int("n") == old.instance.get_int("n").map(|n| n + 1)
        }),
    )
    .unwrap();
    reg.add_postcondition(inc, returns("returns new n", |r| r.as_int().is_some()))
        .unwrap();

    let mut inst = reg.construct(ty, &[]).unwrap();
    for expected in 1..=3 {
        assert_eq!(reg.call(&mut inst, "inc", &[]).unwrap(), Value::Int(expected));
    }
}

#[test]
fn unknown_operation_is_an_engine_error() {
    let ex = example(sum);
    let mut inst = ex.reg.construct(ex.ty, &[]).unwrap();
    let err = ex.reg.call(&mut inst, "missing", &[]).unwrap_err();
    assert!(matches!(err, CallError::Engine(_)));
}
