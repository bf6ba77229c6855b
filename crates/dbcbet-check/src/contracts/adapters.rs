//! Adapters from plain boolean functions to the predicate shapes.
//!
//! Most contracts only look at one of state, arguments, or return value.
//! These helpers build the full-shape predicate from the narrow function.

use std::sync::Arc;

use dbcbet_core::{Instance, Value, ValueKind};

use crate::contracts::predicate::{Invariant, Postcondition, Precondition, Predicate};
use crate::contracts::snapshot::Snapshot;

/// State-only precondition.
pub fn state(
    name: impl Into<String>,
    f: impl Fn(&Instance) -> bool + Send + Sync + 'static,
) -> Precondition {
    Precondition::new(name, move |s, _| f(s))
}

/// State-only postcondition, evaluated on the post-call state.
pub fn post_state(
    name: impl Into<String>,
    f: impl Fn(&Instance) -> bool + Send + Sync + 'static,
) -> Postcondition {
    Postcondition::new(name, move |s, _, _, _| f(s))
}

/// Argument-only precondition over the whole argument list.
pub fn args(
    name: impl Into<String>,
    f: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
) -> Precondition {
    Precondition::new(name, move |_, a| f(a))
}

/// One check per positional argument. Fails if there are fewer arguments
/// than checks.
pub fn positional(name: impl Into<String>, checks: &[fn(&Value) -> bool]) -> Precondition {
    let checks = checks.to_vec();
    Precondition::new(name, move |_, a| {
        a.len() >= checks.len() && checks.iter().zip(a).all(|(check, v)| check(v))
    })
}

/// Return-value-only postcondition.
pub fn returns(
    name: impl Into<String>,
    f: impl Fn(&Value) -> bool + Send + Sync + 'static,
) -> Postcondition {
    Postcondition::new(name, move |_, _, r, _| f(r))
}

/// Accepts each positional argument that matches its expected kind or is
/// null. Arguments beyond the listed kinds are not checked.
pub fn argument_types(kinds: impl IntoIterator<Item = ValueKind>) -> Precondition {
    let kinds: Vec<ValueKind> = kinds.into_iter().collect();
    let expected = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let name = format!("argument_types({expected})");
    Precondition::new(name, move |_, a| {
        kinds
            .iter()
            .zip(a)
            .all(|(kind, v)| v.is_null() || kind.matches(v))
    })
    .describe(format!("arguments must have types ({expected})"))
}

/// Holds iff the post-call state equals the snapshot state.
pub fn immutable() -> Postcondition {
    Postcondition::new("immutable", |s, old, _, _| *s == old.instance)
}

/// Logical negation of a predicate.
pub trait Negate {
    fn negate(self) -> Self;
}

fn negated_parts<F: ?Sized>(p: &Predicate<F>) -> (String, Option<String>) {
    (
        format!("not {}", p.name()),
        p.description().map(|d| format!("not ({d})")),
    )
}

impl Negate for Precondition {
    fn negate(self) -> Self {
        let (name, description) = negated_parts(&self);
        let inner = Arc::clone(self.check());
        Predicate::from_parts(
            name,
            description,
            Arc::new(move |s: &Instance, a: &[Value]| !inner(s, a)),
        )
    }
}

impl Negate for Postcondition {
    fn negate(self) -> Self {
        let (name, description) = negated_parts(&self);
        let inner = Arc::clone(self.check());
        Predicate::from_parts(
            name,
            description,
            Arc::new(move |s: &Instance, old: &Snapshot, r: &Value, a: &[Value]| {
                !inner(s, old, r, a)
            }),
        )
    }
}

impl Negate for Invariant {
    fn negate(self) -> Self {
        let (name, description) = negated_parts(&self);
        let inner = Arc::clone(self.check());
        Predicate::from_parts(name, description, Arc::new(move |s: &Instance| !inner(s)))
    }
}

/// `not(p)` holds exactly when `p` does not.
pub fn not<P: Negate>(p: P) -> P {
    p.negate()
}
