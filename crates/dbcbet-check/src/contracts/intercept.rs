//! The invocation interceptor.
//!
//! [`CheckedCall`] wraps an inner invoker (normally a [`RawCall`]) and runs
//! the checked-call sequence around it:
//!
//! 1. preconditions against the current state and arguments,
//! 2. an old-state snapshot,
//! 3. the inner call,
//! 4. postconditions, then the runtime type's invariants,
//! 5. on a raised exception, classification against the allowed set.
//!
//! Violations and engine failures from nested calls pass through unchanged.

use std::sync::Arc;

use dbcbet_core::{Exception, Instance, OperationId, Value};

use crate::contracts::registry::{ContractRegistry, OperationBody};
use crate::contracts::snapshot::Snapshot;
use crate::contracts::{
    ContractViolation, InvariantViolation, OperationRef, PostconditionViolation,
    PreconditionViolation, ThrowsViolation,
};
use crate::error::CallError;

/// Something that can carry out a call on an instance.
pub trait Invoke: Send + Sync {
    fn invoke(
        &self,
        registry: &ContractRegistry,
        op: OperationId,
        inst: &mut Instance,
        args: &[Value],
    ) -> Result<Value, CallError>;

    /// Marker for an invoker that already checks contracts.
    fn is_checked(&self) -> bool {
        false
    }
}

/// Calls the operation body with no checks.
pub struct RawCall {
    body: OperationBody,
}

impl RawCall {
    pub fn new(body: OperationBody) -> Self {
        RawCall { body }
    }
}

impl Invoke for RawCall {
    fn invoke(
        &self,
        registry: &ContractRegistry,
        _op: OperationId,
        inst: &mut Instance,
        args: &[Value],
    ) -> Result<Value, CallError> {
        (self.body)(registry, inst, args)
    }
}

/// Runs the checked-call sequence around `inner`.
pub struct CheckedCall {
    inner: Arc<dyn Invoke>,
}

/// Wraps `inner` in a [`CheckedCall`]. Wrapping an invoker that is already
/// checked returns it unchanged.
pub fn intercept(inner: Arc<dyn Invoke>) -> Arc<dyn Invoke> {
    if inner.is_checked() {
        return inner;
    }
    Arc::new(CheckedCall { inner })
}

impl Invoke for CheckedCall {
    fn invoke(
        &self,
        registry: &ContractRegistry,
        op: OperationId,
        inst: &mut Instance,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let operation = registry.operation_ref(inst, op)?;
        let contract = registry.contract(op)?;

        tracing::trace!(%operation, "checking preconditions");
        if let Err(failed) = contract.check_preconditions(inst, args) {
            return Err(ContractViolation::from(PreconditionViolation {
                failed,
                instance: inst.clone(),
                operation,
                arguments: args.to_vec(),
            })
            .into());
        }

        let old = Snapshot::capture(registry, inst, args)?;

        tracing::trace!(%operation, "invoking");
        let returned = match self.inner.invoke(registry, op, inst, args) {
            Ok(value) => value,
            Err(CallError::Raised(exception)) => {
                return Err(classify_exception(registry, op, inst, args, operation, exception)?);
            }
            Err(other) => return Err(other),
        };

        tracing::trace!(%operation, "checking postconditions");
        if let Some(p) = contract
            .postconditions()
            .iter()
            .find(|p| !p.holds(inst, &old, &returned, args))
        {
            return Err(ContractViolation::from(PostconditionViolation {
                predicate: p.label().to_string(),
                instance: inst.clone(),
                old,
                returned,
                operation,
                arguments: args.to_vec(),
            })
            .into());
        }

        tracing::trace!(%operation, "checking invariants");
        if let Some(p) = registry.invariants(inst.type_id())?.first_failure(inst) {
            return Err(ContractViolation::from(InvariantViolation {
                predicate: p.label().to_string(),
                instance: inst.clone(),
                operation,
                arguments: args.to_vec(),
            })
            .into());
        }

        Ok(returned)
    }

    fn is_checked(&self) -> bool {
        true
    }
}

/// Returns the error to propagate for a raised exception: the exception
/// itself if allowed, a throws violation otherwise.
fn classify_exception(
    registry: &ContractRegistry,
    op: OperationId,
    inst: &Instance,
    args: &[Value],
    operation: OperationRef,
    exception: Exception,
) -> Result<CallError, CallError> {
    let allowed = registry.contract(op)?.allowed_exceptions();
    let hierarchy = registry.exceptions();
    match allowed {
        Some(allowed) if !hierarchy.covered_by(exception.class, allowed) => {
            tracing::trace!(
                %operation,
                category = hierarchy.name(exception.class),
                "undeclared exception"
            );
            Ok(ContractViolation::from(ThrowsViolation {
                category: hierarchy.name(exception.class).to_string(),
                exception,
                instance: inst.clone(),
                operation,
                arguments: args.to_vec(),
            })
            .into())
        }
        _ => Ok(CallError::Raised(exception)),
    }
}
