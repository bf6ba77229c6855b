//! Candidate instance construction.

use dbcbet_core::{Instance, TypeId, CONSTRUCTOR};

use crate::contracts::registry::ContractRegistry;
use crate::error::{CallError, EngineError};
use crate::finitize::enumerate::combinations;
use crate::finitize::{FieldAssignment, FinitizationRegistry};

/// Builds instances from finitized constructor arguments and field sets.
pub struct CandidateBuilder<'a> {
    registry: &'a ContractRegistry,
    finitizations: &'a FinitizationRegistry,
    argument_scope: Option<usize>,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(
        registry: &'a ContractRegistry,
        finitizations: &'a FinitizationRegistry,
        argument_scope: Option<usize>,
    ) -> Self {
        CandidateBuilder {
            registry,
            finitizations,
            argument_scope,
        }
    }

    /// Constructs an instance of `ty`.
    ///
    /// With a finitized constructor, argument combinations are tried in
    /// order and the first one that passes the constructor's precondition
    /// wins. Other failures propagate. If every combination is rejected, or
    /// there is no finitized constructor, the zero-argument constructor is
    /// used.
    pub fn build_instance(&self, ty: TypeId) -> Result<Instance, CallError> {
        let finitized = self
            .registry
            .resolve(ty, CONSTRUCTOR)
            .and_then(|op| Some((op, self.finitizations.arguments(op)?)));

        if let Some((ctor, domains)) = finitized {
            let arity = self.registry.operation(ctor)?.arity();
            if domains.len() != arity {
                return Err(EngineError::ArityMismatch {
                    operation: format!("{}.{CONSTRUCTOR}", self.registry.type_name(ty)?),
                    expected: arity,
                    got: domains.len(),
                }
                .into());
            }
            for args in combinations(domains, self.argument_scope) {
                let mut inst = self.registry.bare_instance(ty)?;
                match self.registry.invoke(ctor, &mut inst, &args) {
                    Ok(_) => return Ok(inst),
                    Err(e) if e.is_precondition_violation() => {
                        tracing::trace!(type_id = %ty, "constructor arguments rejected");
                    }
                    Err(e) => return Err(e),
                }
            }
            tracing::debug!(
                type_id = %ty,
                "no finitized constructor arguments accepted; using zero-argument constructor"
            );
        }
        self.registry.construct(ty, &[])
    }

    /// Constructs an instance, then assigns `assignment` directly to its
    /// fields without going through any operation.
    pub fn build_from_field_set(
        &self,
        ty: TypeId,
        assignment: &FieldAssignment,
    ) -> Result<Instance, CallError> {
        let mut inst = self.build_instance(ty)?;
        for (name, value) in assignment {
            inst.set(name.clone(), value.clone());
        }
        Ok(inst)
    }
}
