//! Contract inheritance across a two-level hierarchy.
//!
//! `TestBaseClass.a_method(a)` sets `x = a`; `TestSubClass` overrides it to
//! set `x = a + 1`. Contracts on each level:
//!
//! | level | invariant | precondition       | postcondition      |
//! |-------|-----------|--------------------|--------------------|
//! | base  | `x != 1`  | `a != 3`           | `a != 5`           |
//! | sub   | `x != 2`  | `a != 4 && a != 7` | `a != 6 && a != 8` |
//!
//! After composition the subtype accepts `a` if either level's precondition
//! does, must satisfy both levels' postconditions, and both invariants.

use dbcbet_check::{
    Bet, CallError, ContractKind, ContractRegistry, Domain, FinitizationRegistry, Invariant,
    OperationDecl, Postcondition, Precondition,
};
use dbcbet_core::{OperationId, TypeId, Value};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Which contract pieces to declare. The body and invariant guards are
/// always present.
#[derive(Clone, Copy)]
struct Pieces {
    pre: bool,
    post: bool,
    inv: bool,
}

const ALL: Pieces = Pieces {
    pre: true,
    post: true,
    inv: true,
};

struct Hierarchy {
    reg: ContractRegistry,
    base: TypeId,
    sub: TypeId,
    base_op: OperationId,
    sub_op: OperationId,
}

fn arg(a: &[Value]) -> i64 {
    a[0].as_int().unwrap()
}

fn a_is_not(n: i64) -> impl Fn(&dbcbet_core::Instance, &[Value]) -> bool + Send + Sync {
    move |_, a| arg(a) != n
}

fn x_is_not(n: i64) -> impl Fn(&dbcbet_core::Instance) -> bool + Send + Sync {
    move |s| !s.has("x") || s.get_int("x") != Some(n)
}

fn hierarchy(pieces: Pieces) -> Hierarchy {
    let mut reg = ContractRegistry::new();
    let base = reg.declare_type("TestBaseClass", &[]).unwrap();
    let sub = reg.declare_type("TestSubClass", &[base]).unwrap();

    let base_op = reg
        .declare_operation(
            base,
            OperationDecl::method("a_method", 1, |_, inst, a| {
                inst.set("x", arg(a));
                Ok(Value::Null)
            }),
        )
        .unwrap();
    let sub_op = reg
        .declare_operation(
            sub,
            OperationDecl::method("a_method", 1, |_, inst, a| {
                inst.set("x", arg(a) + 1);
                Ok(Value::Null)
            }),
        )
        .unwrap();

    if pieces.inv {
        reg.add_invariant(base, Invariant::new("base_class_inv", x_is_not(1)))
            .unwrap();
        reg.add_invariant(sub, Invariant::new("sub_class_inv", x_is_not(2)))
            .unwrap();
    }
    if pieces.pre {
        reg.add_precondition(base_op, Precondition::new("base_class_method_pre", a_is_not(3)))
            .unwrap();
        reg.add_precondition(sub_op, Precondition::new("sub_class_method_pre", a_is_not(4)))
            .unwrap();
        reg.add_precondition(sub_op, Precondition::new("sub_class_method_pre2", a_is_not(7)))
            .unwrap();
    }
    if pieces.post {
        reg.add_postcondition(
            base_op,
            Postcondition::new("base_class_method_post", |_, _, _, a| arg(a) != 5),
        )
        .unwrap();
        reg.add_postcondition(
            sub_op,
            Postcondition::new("sub_class_method_post", |_, _, _, a| arg(a) != 6),
        )
        .unwrap();
        reg.add_postcondition(
            sub_op,
            Postcondition::new("sub_class_method_post2", |_, _, _, a| arg(a) != 8),
        )
        .unwrap();
    }

    reg.compose_all().unwrap();
    Hierarchy {
        reg,
        base,
        sub,
        base_op,
        sub_op,
    }
}

/// Calls `a_method(a)` on a fresh instance of `ty`.
fn call(h: &Hierarchy, ty: TypeId, a: i64) -> Result<Value, CallError> {
    let mut inst = h.reg.construct(ty, &[]).unwrap();
    h.reg.call(&mut inst, "a_method", &[Value::Int(a)])
}

fn violation_kind(result: Result<Value, CallError>) -> Option<ContractKind> {
    match result {
        Ok(_) => None,
        Err(e) => Some(e.violation().expect("contract violation").kind()),
    }
}

// ---------------------------------------------------------------------------
// Bounded-exhaustive run
// ---------------------------------------------------------------------------

#[test]
fn subtype_run_counts() {
    let h = hierarchy(ALL);
    let mut fin = FinitizationRegistry::new();
    fin.attach_arguments(h.sub_op, vec![Domain::ints(-1..10)]);

    let invoice = Bet::new(&h.reg, &fin).run(h.sub).unwrap();
    assert_eq!(invoice.candidates, 1);
    assert_eq!(invoice.call_candidates, 11);
    assert_eq!(invoice.precondition_violations, 0);
    assert_eq!(invoice.successes, 6);
    assert_eq!(invoice.failures, 5);
    assert_eq!(invoice.failure_kinds.invariant, 2);
    assert_eq!(invoice.failure_kinds.postcondition, 3);
}

#[test]
fn base_domains_do_not_apply_to_subtype_override() {
    let h = hierarchy(ALL);
    let mut fin = FinitizationRegistry::new();
    fin.attach_arguments(h.base_op, vec![Domain::ints(-1..10)]);

    let invoice = Bet::new(&h.reg, &fin).run(h.sub).unwrap();
    assert_eq!(invoice.call_candidates, 0);

    let invoice = Bet::new(&h.reg, &fin).run(h.base).unwrap();
    assert_eq!(invoice.call_candidates, 11);
    // a = 3 rejected; a = 1 breaks x != 1; a = 5 breaks the postcondition.
    assert_eq!(invoice.precondition_violations, 1);
    assert_eq!(invoice.failures, 2);
    assert_eq!(invoice.successes, 8);
}

// ---------------------------------------------------------------------------
// Explicit calls
// ---------------------------------------------------------------------------

#[test]
fn subtype_outcomes_per_argument() {
    let h = hierarchy(ALL);
    let expected = [
        (-1, None),
        (0, Some(ContractKind::Invariant)),
        (1, Some(ContractKind::Invariant)),
        (2, None),
        (3, None),
        (4, None),
        (5, Some(ContractKind::Postcondition)),
        (6, Some(ContractKind::Postcondition)),
        (7, None),
        (8, Some(ContractKind::Postcondition)),
        (9, None),
    ];
    for (a, kind) in expected {
        assert_eq!(violation_kind(call(&h, h.sub, a)), kind, "a = {a}");
    }
}

#[test]
fn base_postcondition_is_reported_by_name() {
    let h = hierarchy(ALL);
    let err = call(&h, h.sub, 5).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Postcondition Violation: Instance of TestSubClass"), "{text}");
    assert!(text.ends_with("Contract: base_class_method_post"), "{text}");
}

#[test]
fn base_type_keeps_its_own_contract() {
    let h = hierarchy(ALL);
    assert!(call(&h, h.base, 3).unwrap_err().is_precondition_violation());
    assert!(call(&h, h.base, 4).is_ok());
    assert!(call(&h, h.base, 2).is_ok());
    assert_eq!(
        violation_kind(call(&h, h.base, 1)),
        Some(ContractKind::Invariant)
    );
}

#[test]
fn subtype_rejects_only_when_every_group_fails() {
    let mut reg = ContractRegistry::new();
    let base = reg.declare_type("Base", &[]).unwrap();
    let sub = reg.declare_type("Sub", &[base]).unwrap();
    let base_op = reg
        .declare_operation(base, OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)))
        .unwrap();
    let sub_op = reg
        .declare_operation(sub, OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)))
        .unwrap();
    reg.add_precondition(base_op, Precondition::new("a < 0", |_, a| arg(a) < 0))
        .unwrap();
    reg.add_precondition(sub_op, Precondition::new("a > 10", |_, a| arg(a) > 10))
        .unwrap();
    reg.compose_all().unwrap();

    let mut inst = reg.construct(sub, &[]).unwrap();
    assert!(reg.call(&mut inst, "f", &[Value::Int(-5)]).is_ok());
    assert!(reg.call(&mut inst, "f", &[Value::Int(20)]).is_ok());
    let err = reg.call(&mut inst, "f", &[Value::Int(5)]).unwrap_err();
    match err.violation() {
        Some(dbcbet_check::ContractViolation::Precondition(v)) => {
            assert_eq!(v.failed, vec!["a > 10".to_string(), "a < 0".to_string()]);
        }
        other => panic!("expected precondition violation, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// One kind of contract at a time
// ---------------------------------------------------------------------------

#[test]
fn only_preconditions() {
    let h = hierarchy(Pieces {
        pre: true,
        post: false,
        inv: false,
    });
    // No argument fails both groups.
    for a in -1..10 {
        assert!(call(&h, h.sub, a).is_ok(), "a = {a}");
    }
}

#[test]
fn override_group_alone_when_base_declares_none() {
    let mut reg = ContractRegistry::new();
    let base = reg.declare_type("Base", &[]).unwrap();
    let sub = reg.declare_type("Sub", &[base]).unwrap();
    reg.declare_operation(base, OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)))
        .unwrap();
    let sub_op = reg
        .declare_operation(sub, OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)))
        .unwrap();
    reg.add_precondition(sub_op, Precondition::new("a != 4", a_is_not(4)))
        .unwrap();
    reg.add_precondition(sub_op, Precondition::new("a != 7", a_is_not(7)))
        .unwrap();
    reg.compose_all().unwrap();

    let mut inst = reg.construct(sub, &[]).unwrap();
    for (a, accepted) in [(4, false), (5, true), (7, false)] {
        let result = reg.call(&mut inst, "f", &[Value::Int(a)]);
        assert_eq!(result.is_ok(), accepted, "a = {a}");
    }
}

#[test]
fn only_postconditions() {
    let h = hierarchy(Pieces {
        pre: false,
        post: true,
        inv: false,
    });
    assert_eq!(violation_kind(call(&h, h.sub, 6)), Some(ContractKind::Postcondition));
    assert_eq!(violation_kind(call(&h, h.sub, 8)), Some(ContractKind::Postcondition));
    assert_eq!(violation_kind(call(&h, h.sub, 5)), Some(ContractKind::Postcondition));
    assert_eq!(violation_kind(call(&h, h.sub, 7)), None);
}

#[test]
fn only_invariants() {
    let h = hierarchy(Pieces {
        pre: false,
        post: false,
        inv: true,
    });
    assert_eq!(violation_kind(call(&h, h.sub, -1)), None);
    assert_eq!(violation_kind(call(&h, h.sub, 2)), None);
    assert_eq!(violation_kind(call(&h, h.sub, 0)), Some(ContractKind::Invariant));
    assert_eq!(violation_kind(call(&h, h.sub, 1)), Some(ContractKind::Invariant));
}

#[test]
fn empty_override_group_inherits_base_group() {
    let mut reg = ContractRegistry::new();
    let base = reg.declare_type("Base", &[]).unwrap();
    let sub = reg.declare_type("Sub", &[base]).unwrap();
    let base_op = reg
        .declare_operation(
            base,
            OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)),
        )
        .unwrap();
    reg.declare_operation(sub, OperationDecl::method("f", 1, |_, _, _| Ok(Value::Null)))
        .unwrap();
    reg.add_precondition(base_op, Precondition::new("a != 3", a_is_not(3)))
        .unwrap();
    reg.compose_all().unwrap();

    let mut inst = reg.construct(sub, &[]).unwrap();
    assert!(reg.call(&mut inst, "f", &[Value::Int(2)]).is_ok());
    assert!(reg
        .call(&mut inst, "f", &[Value::Int(3)])
        .unwrap_err()
        .is_precondition_violation());
}
