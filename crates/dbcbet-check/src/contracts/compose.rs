//! Inheritance composition of contracts.
//!
//! Composition merges each direct base's contract into a derived type once
//! per `(derived, base)` edge:
//!
//! - invariants accumulate;
//! - precondition groups are OR-ed in, unless the base precondition is
//!   final, in which case the base groups replace the derived ones;
//! - postconditions are AND-ed in;
//! - allowed exceptions narrow: an override may only allow categories
//!   covered by the base set, and an override that declares none inherits
//!   the base set.
//!
//! Deeper hierarchies are handled by composing bases before their
//! subtypes, which [`ContractRegistry::compose_all`] does in topological
//! order.

use petgraph::algo::toposort;

use dbcbet_core::{CoreError, ExceptionId, OperationId, TypeId};

use crate::contracts::predicate::Precondition;
use crate::contracts::registry::ContractRegistry;
use crate::error::ContractDeclarationError;

/// A redeclared operation and the base operation it overrides.
struct Override {
    derived_op: OperationId,
    base_op: OperationId,
}

impl ContractRegistry {
    /// Whether `base` has already been composed into `derived`.
    pub fn is_merged(&self, derived: TypeId, base: TypeId) -> bool {
        self.merged.contains(&(derived, base))
    }

    /// Composes every type, bases before subtypes.
    pub fn compose_all(&mut self) -> Result<(), ContractDeclarationError> {
        let order = toposort(&self.hierarchy, None).map_err(|cycle| {
            let ty = TypeId(cycle.node_id().index() as u32);
            CoreError::InheritanceCycle {
                type_name: self
                    .type_name(ty)
                    .map(str::to_string)
                    .unwrap_or_else(|_| ty.to_string()),
            }
        })?;
        // Edges run derived -> base, so reverse to visit bases first.
        for node in order.into_iter().rev() {
            self.compose_inheritance(TypeId(node.index() as u32))?;
        }
        Ok(())
    }

    /// Merges each direct base of `derived` not yet merged into it.
    ///
    /// Every base edge is validated before anything is modified, so an
    /// error leaves the registry unchanged.
    pub fn compose_inheritance(&mut self, derived: TypeId) -> Result<(), ContractDeclarationError> {
        let bases: Vec<TypeId> = self
            .bases(derived)?
            .iter()
            .copied()
            .filter(|base| !self.is_merged(derived, *base))
            .collect();

        let mut plan = Vec::with_capacity(bases.len());
        for base in bases {
            let overrides = self.overrides(derived, base)?;
            for o in &overrides {
                self.check_narrowing(derived, base, o)?;
            }
            plan.push((base, overrides));
        }

        for (base, overrides) in plan {
            let invariants: Vec<_> = self.invariants(base)?.iter().cloned().collect();
            let entry = self.type_entry_mut(derived)?;
            for p in invariants {
                entry.invariants.push(p);
            }
            for o in &overrides {
                self.merge_operation(o)?;
            }
            self.merged.insert((derived, base));
            tracing::debug!(
                derived = self.type_name(derived)?,
                base = self.type_name(base)?,
                operations = overrides.len(),
                "composed inherited contract"
            );
        }
        Ok(())
    }

    /// Public operations `derived` declares itself that also resolve on `base`.
    fn overrides(&self, derived: TypeId, base: TypeId) -> Result<Vec<Override>, CoreError> {
        let mut result = Vec::new();
        for derived_op in self.own_operations(derived)? {
            let entry = self.operation(derived_op)?;
            if !entry.is_public() {
                continue;
            }
            let Some(base_op) = self.resolve(base, entry.name()) else {
                continue;
            };
            if self.operation(base_op)?.is_public() {
                result.push(Override { derived_op, base_op });
            }
        }
        Ok(result)
    }

    fn check_narrowing(
        &self,
        derived: TypeId,
        base: TypeId,
        o: &Override,
    ) -> Result<(), ContractDeclarationError> {
        let derived_entry = self.operation(o.derived_op)?;
        let (Some(declared), Some(allowed)) = (
            derived_entry.contract().allowed_exceptions(),
            self.contract(o.base_op)?.allowed_exceptions(),
        ) else {
            return Ok(());
        };
        let hierarchy = self.exceptions();
        match declared.iter().find(|c| !hierarchy.covered_by(**c, allowed)) {
            Some(category) => Err(ContractDeclarationError::WidenedExceptions {
                derived: self.type_name(derived)?.to_string(),
                base: self.type_name(base)?.to_string(),
                operation: derived_entry.name().to_string(),
                category: hierarchy.name(*category).to_string(),
            }),
            None => Ok(()),
        }
    }

    fn merge_operation(&mut self, o: &Override) -> Result<(), CoreError> {
        let base = self.contract(o.base_op)?;
        let base_final = base.is_final();
        let base_groups: Vec<Vec<Precondition>> =
            base.precondition_groups().map(<[Precondition]>::to_vec).collect();
        let base_posts = base.postconditions().to_vec();
        let base_allowed: Option<Vec<ExceptionId>> = base.allowed_exceptions().map(<[_]>::to_vec);

        let entry = self.operation_mut(o.derived_op)?;
        let name = entry.name.clone();
        let spec = &mut entry.contract;

        if base_final {
            if !spec.own_preconditions().is_empty() {
                tracing::warn!(
                    operation = %name,
                    discarded = spec.own_preconditions().len(),
                    "base precondition is final; discarding override preconditions"
                );
            }
            spec.replace_groups(base_groups.iter().map(Vec::as_slice));
            spec.set_final();
        } else if spec.is_final() {
            tracing::debug!(operation = %name, "override precondition is final; not widening");
        } else {
            spec.append_groups(base_groups.iter().map(Vec::as_slice));
        }

        for p in base_posts {
            spec.push_postcondition(p);
        }

        if spec.allowed_exceptions().is_none() {
            spec.set_allowed(base_allowed);
        }
        Ok(())
    }
}
