//! Per-operation and per-type contract storage.

use dbcbet_core::{ExceptionId, Instance, Value};

use crate::contracts::predicate::{Invariant, Postcondition, Precondition};

/// Contract attached to one operation.
///
/// Preconditions are an OR of AND-groups. The operation's own declarations
/// form the first group; each inherited alternative is kept as its own
/// group behind it. Postconditions are a flat AND list.
#[derive(Debug, Clone, Default)]
pub struct ContractSpec {
    own_preconditions: Vec<Precondition>,
    inherited_groups: Vec<Vec<Precondition>>,
    postconditions: Vec<Postcondition>,
    /// `None` means no declaration was made: every exception is allowed.
    allowed_exceptions: Option<Vec<ExceptionId>>,
    final_precondition: bool,
}

impl ContractSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// All precondition groups in evaluation order. An empty own group is
    /// omitted.
    pub fn precondition_groups(&self) -> impl Iterator<Item = &[Precondition]> + '_ {
        let own = (!self.own_preconditions.is_empty()).then_some(self.own_preconditions.as_slice());
        own.into_iter()
            .chain(self.inherited_groups.iter().map(Vec::as_slice))
    }

    pub fn has_precondition(&self) -> bool {
        self.precondition_groups().next().is_some()
    }

    /// Checks the OR of AND-groups. On failure returns the label of the
    /// first failing predicate of every group, in group order.
    pub fn check_preconditions(&self, state: &Instance, args: &[Value]) -> Result<(), Vec<String>> {
        let mut failed = Vec::new();
        for group in self.precondition_groups() {
            match group.iter().find(|p| !p.holds(state, args)) {
                None => return Ok(()),
                Some(p) => failed.push(p.label().to_string()),
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(failed)
        }
    }

    pub fn preconditions_hold(&self, state: &Instance, args: &[Value]) -> bool {
        self.check_preconditions(state, args).is_ok()
    }

    pub fn own_preconditions(&self) -> &[Precondition] {
        &self.own_preconditions
    }

    pub fn postconditions(&self) -> &[Postcondition] {
        &self.postconditions
    }

    pub fn allowed_exceptions(&self) -> Option<&[ExceptionId]> {
        self.allowed_exceptions.as_deref()
    }

    pub fn is_final(&self) -> bool {
        self.final_precondition
    }

    pub(crate) fn push_precondition(&mut self, p: Precondition) {
        self.own_preconditions.push(p);
    }

    pub(crate) fn push_postcondition(&mut self, p: Postcondition) {
        if !self.postconditions.iter().any(|q| q.same_check(&p)) {
            self.postconditions.push(p);
        }
    }

    pub(crate) fn extend_allowed(&mut self, categories: &[ExceptionId]) {
        let allowed = self.allowed_exceptions.get_or_insert_with(Vec::new);
        for c in categories {
            if !allowed.contains(c) {
                allowed.push(*c);
            }
        }
    }

    pub(crate) fn set_allowed(&mut self, allowed: Option<Vec<ExceptionId>>) {
        self.allowed_exceptions = allowed;
    }

    pub(crate) fn set_final(&mut self) {
        self.final_precondition = true;
    }

    /// Adds `groups` as alternatives, skipping groups already present.
    pub(crate) fn append_groups<'a>(
        &mut self,
        groups: impl IntoIterator<Item = &'a [Precondition]>,
    ) {
        for group in groups {
            if !self.has_group(group) {
                self.inherited_groups.push(group.to_vec());
            }
        }
    }

    /// Discards every group and installs `groups`.
    pub(crate) fn replace_groups<'a>(
        &mut self,
        groups: impl IntoIterator<Item = &'a [Precondition]>,
    ) {
        self.own_preconditions.clear();
        self.inherited_groups = groups.into_iter().map(<[Precondition]>::to_vec).collect();
    }

    fn has_group(&self, group: &[Precondition]) -> bool {
        self.precondition_groups().any(|existing| {
            existing.len() == group.len()
                && existing.iter().zip(group).all(|(a, b)| a.same_check(b))
        })
    }
}

/// Invariants attached to one type, in accumulation order.
#[derive(Debug, Clone, Default)]
pub struct InvariantSpec {
    predicates: Vec<Invariant>,
}

impl InvariantSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unless the same check is already present.
    pub fn push(&mut self, p: Invariant) {
        if !self.predicates.iter().any(|q| q.same_check(&p)) {
            self.predicates.push(p);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invariant> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn first_failure(&self, state: &Instance) -> Option<&Invariant> {
        self.predicates.iter().find(|p| !p.holds(state))
    }

    pub fn holds(&self, state: &Instance) -> bool {
        self.first_failure(state).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcbet_core::TypeId;

    fn a_is_not(n: i64) -> Precondition {
        Precondition::new(format!("a != {n}"), move |_, args| args[0].as_int() != Some(n))
    }

    fn subject() -> Instance {
        Instance::new(TypeId(0), "T", [])
    }

    #[test]
    fn no_groups_means_always_callable() {
        let spec = ContractSpec::new();
        assert!(!spec.has_precondition());
        assert!(spec.preconditions_hold(&subject(), &[Value::Int(3)]));
    }

    #[test]
    fn groups_are_or_of_and() {
        let mut spec = ContractSpec::new();
        spec.push_precondition(a_is_not(4));
        spec.push_precondition(a_is_not(7));
        let base = vec![a_is_not(3)];
        spec.append_groups([base.as_slice()]);

        // Own group passes for 3, inherited group passes for 4 and 7.
        for a in [3, 4, 7, 10] {
            assert!(spec.preconditions_hold(&subject(), &[Value::Int(a)]), "a = {a}");
        }

        let mut only_own = ContractSpec::new();
        only_own.push_precondition(a_is_not(4));
        only_own.push_precondition(a_is_not(7));
        let err = only_own.check_preconditions(&subject(), &[Value::Int(7)]).unwrap_err();
        assert_eq!(err, vec!["a != 7".to_string()]);
    }

    #[test]
    fn failure_reports_one_predicate_per_group() {
        let mut spec = ContractSpec::new();
        spec.push_precondition(a_is_not(3));
        let inherited = vec![a_is_not(3), a_is_not(5)];
        spec.append_groups([inherited.as_slice()]);
        let err = spec.check_preconditions(&subject(), &[Value::Int(3)]).unwrap_err();
        assert_eq!(err, vec!["a != 3".to_string(), "a != 3".to_string()]);
    }

    #[test]
    fn appending_the_same_group_twice_is_a_no_op() {
        let mut spec = ContractSpec::new();
        let base = vec![a_is_not(3)];
        spec.append_groups([base.as_slice()]);
        spec.append_groups([base.as_slice()]);
        assert_eq!(spec.precondition_groups().count(), 1);
    }

    #[test]
    fn replace_discards_own_group() {
        let mut spec = ContractSpec::new();
        spec.push_precondition(a_is_not(4));
        let base = vec![a_is_not(3)];
        spec.replace_groups([base.as_slice()]);
        assert!(spec.own_preconditions().is_empty());
        assert!(spec.preconditions_hold(&subject(), &[Value::Int(4)]));
        assert!(!spec.preconditions_hold(&subject(), &[Value::Int(3)]));
    }

    #[test]
    fn allowed_exceptions_start_undeclared() {
        let mut spec = ContractSpec::new();
        assert_eq!(spec.allowed_exceptions(), None);
        spec.extend_allowed(&[ExceptionId::VALUE_ERROR, ExceptionId::VALUE_ERROR]);
        assert_eq!(spec.allowed_exceptions(), Some(&[ExceptionId::VALUE_ERROR][..]));
    }

    #[test]
    fn invariant_spec_reports_first_failure() {
        let mut inv = InvariantSpec::new();
        let ok = Invariant::new("ok", |_| true);
        inv.push(ok.clone());
        inv.push(ok);
        inv.push(Invariant::new("never", |_| false));
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.first_failure(&subject()).map(|p| p.name()), Some("never"));
        assert!(!inv.holds(&subject()));
    }
}
