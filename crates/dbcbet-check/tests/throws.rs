//! Allowed-exception contracts and their narrowing along a hierarchy.
//!
//! `do_something(x)` raises `GoodException` for 1, `AnotherGoodException`
//! (a `GoodException`) for 2, `ADifferentGoodException` for 3 and
//! `BadException` for anything else. The base allows `ADifferentGood` and
//! `Good`; the subtype narrows to `AnotherGood`; the sub-subtype declares
//! nothing and inherits the narrowed set.

use dbcbet_check::{
    CallError, ContractDeclarationError, ContractRegistry, ContractViolation, OperationDecl,
};
use dbcbet_core::{ExceptionId, TypeId, Value};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Categories {
    good: ExceptionId,
    bad: ExceptionId,
    another_good: ExceptionId,
    different_good: ExceptionId,
}

struct Fixture {
    reg: ContractRegistry,
    cats: Categories,
    base: TypeId,
    sub: TypeId,
    sub_sub: TypeId,
}

fn declare_categories(reg: &mut ContractRegistry) -> Categories {
    let good = reg
        .declare_exception("GoodException", ExceptionId::EXCEPTION)
        .unwrap();
    let bad = reg
        .declare_exception("BadException", ExceptionId::EXCEPTION)
        .unwrap();
    let another_good = reg.declare_exception("AnotherGoodException", good).unwrap();
    let different_good = reg
        .declare_exception("ADifferentGoodException", ExceptionId::EXCEPTION)
        .unwrap();
    Categories {
        good,
        bad,
        another_good,
        different_good,
    }
}

fn raising(cats: Categories) -> OperationDecl {
    OperationDecl::method("do_something", 1, move |_, _, a| {
        let class = match a[0].as_int() {
            Some(1) => cats.good,
            Some(2) => cats.another_good,
            Some(3) => cats.different_good,
            _ => cats.bad,
        };
        Err(CallError::raise(class, format!("raised for {}", a[0])))
    })
}

fn fixture() -> Fixture {
    let mut reg = ContractRegistry::new();
    let cats = declare_categories(&mut reg);
    let base = reg.declare_type("ThrowsTestClass", &[]).unwrap();
    let sub = reg.declare_type("ThrowsTestSubClass", &[base]).unwrap();
    let sub_sub = reg.declare_type("ThrowsTestSubSubClass", &[sub]).unwrap();

    let base_op = reg.declare_operation(base, raising(cats)).unwrap();
    let sub_op = reg.declare_operation(sub, raising(cats)).unwrap();
    reg.declare_operation(sub_sub, raising(cats)).unwrap();

    reg.add_allowed_exceptions(base_op, &[cats.different_good, cats.good])
        .unwrap();
    reg.add_allowed_exceptions(sub_op, &[cats.another_good])
        .unwrap();
    reg.compose_all().unwrap();

    Fixture {
        reg,
        cats,
        base,
        sub,
        sub_sub,
    }
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Propagated(ExceptionId),
    Translated,
}

fn outcome(f: &Fixture, ty: TypeId, x: i64) -> Outcome {
    let mut inst = f.reg.construct(ty, &[]).unwrap();
    match f.reg.call(&mut inst, "do_something", &[Value::Int(x)]) {
        Err(CallError::Raised(e)) => Outcome::Propagated(e.class),
        Err(CallError::Violation(v)) if matches!(*v, ContractViolation::Throws(_)) => {
            Outcome::Translated
        }
        other => panic!("unexpected outcome for x = {x}: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Three-level hierarchy
// ---------------------------------------------------------------------------

#[test]
fn base_allows_declared_categories_and_subtypes() {
    let f = fixture();
    let c = f.cats;
    assert_eq!(outcome(&f, f.base, 1), Outcome::Propagated(c.good));
    assert_eq!(outcome(&f, f.base, 2), Outcome::Propagated(c.another_good));
    assert_eq!(outcome(&f, f.base, 3), Outcome::Propagated(c.different_good));
    assert_eq!(outcome(&f, f.base, 4), Outcome::Translated);
}

#[test]
fn subtype_narrows_allowed_set() {
    let f = fixture();
    assert_eq!(outcome(&f, f.sub, 1), Outcome::Translated);
    assert_eq!(outcome(&f, f.sub, 2), Outcome::Propagated(f.cats.another_good));
    assert_eq!(outcome(&f, f.sub, 3), Outcome::Translated);
    assert_eq!(outcome(&f, f.sub, 4), Outcome::Translated);
}

#[test]
fn undeclared_override_inherits_narrowed_set() {
    let f = fixture();
    assert_eq!(outcome(&f, f.sub_sub, 1), Outcome::Translated);
    assert_eq!(outcome(&f, f.sub_sub, 2), Outcome::Propagated(f.cats.another_good));
    assert_eq!(outcome(&f, f.sub_sub, 3), Outcome::Translated);
    assert_eq!(outcome(&f, f.sub_sub, 4), Outcome::Translated);

    let op = f.reg.resolve(f.sub_sub, "do_something").unwrap();
    assert_eq!(
        f.reg.contract(op).unwrap().allowed_exceptions(),
        Some(&[f.cats.another_good][..])
    );
}

#[test]
fn translated_violation_keeps_original_exception() {
    let f = fixture();
    let mut inst = f.reg.construct(f.sub, &[]).unwrap();
    let err = f
        .reg
        .call(&mut inst, "do_something", &[Value::Int(4)])
        .unwrap_err();
    match err.violation() {
        Some(ContractViolation::Throws(v)) => {
            assert_eq!(v.exception.class, f.cats.bad);
            assert_eq!(v.exception.message, "raised for 4");
            assert_eq!(v.category, "BadException");
        }
        other => panic!("expected throws violation, got {other:?}"),
    }
    assert!(err.violation().unwrap().is_callee_bug());
    assert!(err.to_string().ends_with("Threw BadException: raised for 4"));
}

// ---------------------------------------------------------------------------
// Declaration checks
// ---------------------------------------------------------------------------

#[test]
fn sibling_category_in_override_is_a_declaration_error() {
    // Base allows {A, A2}; an override allowing {B} widens it.
    let mut reg = ContractRegistry::new();
    let a = reg.declare_exception("A", ExceptionId::EXCEPTION).unwrap();
    let a2 = reg.declare_exception("A2", ExceptionId::EXCEPTION).unwrap();
    let b = reg.declare_exception("B", ExceptionId::EXCEPTION).unwrap();
    let base = reg.declare_type("Base", &[]).unwrap();
    let derived = reg.declare_type("Derived", &[base]).unwrap();
    let base_op = reg
        .declare_operation(base, OperationDecl::method("f", 0, |_, _, _| Ok(Value::Null)))
        .unwrap();
    let derived_op = reg
        .declare_operation(derived, OperationDecl::method("f", 0, |_, _, _| Ok(Value::Null)))
        .unwrap();
    reg.add_allowed_exceptions(base_op, &[a, a2]).unwrap();
    reg.add_allowed_exceptions(derived_op, &[b]).unwrap();

    let err = reg.compose_all().unwrap_err();
    assert!(matches!(err, ContractDeclarationError::WidenedExceptions { .. }));
    assert_eq!(
        err.to_string(),
        "Derived.f allows B, which is neither equal to nor a subtype of any exception allowed by Base.f"
    );
}

#[test]
fn narrowed_override_rejects_dropped_category() {
    let mut reg = ContractRegistry::new();
    let a = reg.declare_exception("A", ExceptionId::EXCEPTION).unwrap();
    let a2 = reg.declare_exception("A2", ExceptionId::EXCEPTION).unwrap();
    let base = reg.declare_type("Base", &[]).unwrap();
    let derived = reg.declare_type("Derived", &[base]).unwrap();
    let raise_named = move || {
        OperationDecl::method("f", 1, move |_, _, args| {
            let class = if args[0].as_str() == Some("A") { a } else { a2 };
            Err(CallError::raise(class, "boom"))
        })
    };
    let base_op = reg.declare_operation(base, raise_named()).unwrap();
    let derived_op = reg.declare_operation(derived, raise_named()).unwrap();
    reg.add_allowed_exceptions(base_op, &[a, a2]).unwrap();
    reg.add_allowed_exceptions(derived_op, &[a2]).unwrap();
    reg.compose_all().unwrap();

    let mut inst = reg.construct(derived, &[]).unwrap();
    let err = reg.call(&mut inst, "f", &[Value::from("A")]).unwrap_err();
    assert!(matches!(err.violation(), Some(ContractViolation::Throws(_))));
    let err = reg.call(&mut inst, "f", &[Value::from("A2")]).unwrap_err();
    assert!(matches!(err, CallError::Raised(e) if e.class == a2));
}

#[test]
fn without_declaration_every_exception_propagates() {
    let mut reg = ContractRegistry::new();
    let cats = declare_categories(&mut reg);
    let ty = reg.declare_type("Unrestricted", &[]).unwrap();
    reg.declare_operation(ty, raising(cats)).unwrap();
    reg.compose_all().unwrap();

    let mut inst = reg.construct(ty, &[]).unwrap();
    let err = reg
        .call(&mut inst, "do_something", &[Value::Int(4)])
        .unwrap_err();
    assert!(matches!(err, CallError::Raised(e) if e.class == cats.bad));
}
