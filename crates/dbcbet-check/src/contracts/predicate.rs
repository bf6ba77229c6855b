//! Named predicates in the three shapes the checked-call protocol evaluates.
//!
//! A predicate pairs a boolean function with a name (shown in violation
//! messages) and an optional longer description. The description, when
//! present, takes precedence in messages.

use std::fmt;
use std::sync::Arc;

use dbcbet_core::{Instance, Value};

use crate::contracts::snapshot::Snapshot;

/// `(state, arguments) -> bool`
pub type PreconditionFn = dyn Fn(&Instance, &[Value]) -> bool + Send + Sync;

/// `(state, old snapshot, return value, arguments) -> bool`
pub type PostconditionFn = dyn Fn(&Instance, &Snapshot, &Value, &[Value]) -> bool + Send + Sync;

/// `(state) -> bool`
pub type InvariantFn = dyn Fn(&Instance) -> bool + Send + Sync;

/// A named boolean check of shape `F`.
pub struct Predicate<F: ?Sized> {
    name: String,
    description: Option<String>,
    check: Arc<F>,
}

pub type Precondition = Predicate<PreconditionFn>;
pub type Postcondition = Predicate<PostconditionFn>;
pub type Invariant = Predicate<InvariantFn>;

impl<F: ?Sized> Predicate<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Attaches a human-readable description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text used in violation messages.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Whether two handles share the same underlying check.
    pub fn same_check(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.check, &other.check)
    }

    pub(crate) fn check(&self) -> &Arc<F> {
        &self.check
    }

    pub(crate) fn from_parts(name: String, description: Option<String>, check: Arc<F>) -> Self {
        Predicate {
            name,
            description,
            check,
        }
    }
}

impl<F: ?Sized> Clone for Predicate<F> {
    fn clone(&self) -> Self {
        Predicate {
            name: self.name.clone(),
            description: self.description.clone(),
            check: Arc::clone(&self.check),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Precondition {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Instance, &[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Predicate::from_parts(name.into(), None, Arc::new(f))
    }

    pub fn holds(&self, state: &Instance, args: &[Value]) -> bool {
        (self.check)(state, args)
    }
}

impl Postcondition {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Instance, &Snapshot, &Value, &[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Predicate::from_parts(name.into(), None, Arc::new(f))
    }

    pub fn holds(
        &self,
        state: &Instance,
        old: &Snapshot,
        returned: &Value,
        args: &[Value],
    ) -> bool {
        (self.check)(state, old, returned, args)
    }
}

impl Invariant {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Instance) -> bool + Send + Sync + 'static,
    ) -> Self {
        Predicate::from_parts(name.into(), None, Arc::new(f))
    }

    pub fn holds(&self, state: &Instance) -> bool {
        (self.check)(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcbet_core::TypeId;

    fn subject(x: i64) -> Instance {
        let mut inst = Instance::new(TypeId(0), "T", []);
        inst.set("x", x);
        inst
    }

    #[test]
    fn label_prefers_description() {
        let p = Invariant::new("non_negative", |s| s.get_int("x").is_some_and(|x| x >= 0));
        assert_eq!(p.label(), "non_negative");
        let p = p.describe("x must be non-negative");
        assert_eq!(p.label(), "x must be non-negative");
        assert_eq!(p.name(), "non_negative");
    }

    #[test]
    fn shapes_evaluate_their_inputs() {
        let pre = Precondition::new("a > 0", |_, args| args[0].as_int().is_some_and(|a| a > 0));
        assert!(pre.holds(&subject(0), &[Value::Int(1)]));
        assert!(!pre.holds(&subject(0), &[Value::Int(0)]));

        let post = Postcondition::new("x grew", |s, old, _, _| {
            s.get_int("x") > old.instance.get_int("x")
        });
        let old = Snapshot {
            instance: subject(1),
            arguments: vec![],
        };
        assert!(post.holds(&subject(2), &old, &Value::Null, &[]));
        assert!(!post.holds(&subject(1), &old, &Value::Null, &[]));
    }

    #[test]
    fn clones_share_the_check() {
        let p = Invariant::new("always", |_| true);
        let q = p.clone();
        assert!(p.same_check(&q));
        assert!(!p.same_check(&Invariant::new("always", |_| true)));
    }
}
