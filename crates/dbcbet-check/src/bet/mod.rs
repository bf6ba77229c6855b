//! Bounded-exhaustive testing of one type under contract.
//!
//! A run walks the phases of [`Phase`] in order. Every field set from the
//! type's finitization becomes a candidate; candidates that break an
//! invariant are discarded (the finitization described an unreachable
//! state). For each surviving candidate, every public operation with an
//! argument finitization is called with each argument combination that
//! passes its precondition on a throwaway copy. Contract violations are
//! counted and logged; anything else aborts the run.
//!
//! The candidate persists across calls, so the effects of one call are
//! visible to the next, as they would be to a real client.

pub mod hook;
pub mod invoice;

use std::fmt;

use serde::{Deserialize, Serialize};

use dbcbet_core::{Instance, OperationId, OperationKind, TypeId, Value};

use crate::contracts::registry::ContractRegistry;
use crate::error::{BetError, CallError, EngineError};
use crate::finitize::enumerate::combinations;
use crate::finitize::{
    format_assignment, CandidateBuilder, Domain, FieldAssignment, FinitizationRegistry,
};

pub use hook::{Attempt, ExternalStateHook};
pub use invoice::{Invoice, LogEntry, ViolationCounts};

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetConfig {
    /// Cap on argument combinations per enumeration (one operation on one
    /// candidate, or one constructor search). `None` is unbounded.
    pub argument_scope: Option<usize>,
    /// Log operations that declare no precondition.
    pub audit_missing_preconditions: bool,
}

impl Default for BetConfig {
    fn default() -> Self {
        BetConfig {
            argument_scope: None,
            audit_missing_preconditions: true,
        }
    }
}

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    InstanceEnumeration,
    InvariantFilter,
    MethodEnumeration,
    PreconditionFilter,
    Invoke,
    Classify,
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An operation under test and its argument domains.
struct Target<'r> {
    op: OperationId,
    name: &'r str,
    domains: &'r [Domain],
}

/// Bounded-exhaustive test driver.
pub struct Bet<'a> {
    registry: &'a ContractRegistry,
    finitizations: &'a FinitizationRegistry,
    config: BetConfig,
    hook: Option<Box<dyn ExternalStateHook + 'a>>,
}

impl<'a> Bet<'a> {
    /// The registry must already be composed.
    pub fn new(registry: &'a ContractRegistry, finitizations: &'a FinitizationRegistry) -> Self {
        Bet {
            registry,
            finitizations,
            config: BetConfig::default(),
            hook: None,
        }
    }

    pub fn with_config(mut self, config: BetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_argument_scope(mut self, scope: usize) -> Self {
        self.config.argument_scope = Some(scope);
        self
    }

    pub fn with_hook(mut self, hook: impl ExternalStateHook + 'a) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &BetConfig {
        &self.config
    }

    /// Runs every candidate of `ty` through every finitized operation.
    pub fn run(&mut self, ty: TypeId) -> Result<Invoice, BetError> {
        let registry = self.registry;
        let finitizations = self.finitizations;
        let type_name = registry.type_name(ty)?.to_string();
        let mut invoice = Invoice::new(type_name.clone());
        tracing::debug!(phase = %Phase::Start, type_name = %type_name, "bounded exhaustive run");

        let targets = self.targets(ty)?;
        let builder = CandidateBuilder::new(registry, finitizations, self.config.argument_scope);
        let invariants = registry.invariants(ty)?;

        for assignment in finitizations.field_assignments(ty) {
            tracing::trace!(
                phase = %Phase::InstanceEnumeration,
                initialization = %format_assignment(&assignment),
                "building candidate"
            );
            let candidate = builder
                .build_from_field_set(ty, &assignment)
                .map_err(|source| match source {
                    CallError::Engine(e) => BetError::Engine(e),
                    source => BetError::Construction {
                        type_name: type_name.clone(),
                        source,
                    },
                })?;

            if let Some(p) = invariants.first_failure(&candidate) {
                tracing::debug!(
                    phase = %Phase::InvariantFilter,
                    initialization = %format_assignment(&assignment),
                    invariant = p.label(),
                    "candidate discarded"
                );
                invoice.invariant_violations += 1;
                continue;
            }
            invoice.candidates += 1;
            self.process_candidate(&mut invoice, candidate, &assignment, &targets)?;
        }

        tracing::info!(
            phase = %Phase::Report,
            type_name = %invoice.type_name,
            candidates = invoice.candidates,
            call_candidates = invoice.call_candidates,
            failures = invoice.failures,
            successes = invoice.successes,
            "run complete"
        );
        Ok(invoice)
    }

    /// Public non-constructor operations of `ty` with argument domains.
    fn targets(&self, ty: TypeId) -> Result<Vec<Target<'a>>, BetError> {
        let registry = self.registry;
        let finitizations = self.finitizations;
        let mut targets = Vec::new();
        for op in registry.public_operations(ty)? {
            let entry = registry.operation(op)?;
            if entry.kind() == OperationKind::Constructor {
                continue;
            }
            let Some(domains) = finitizations.arguments(op) else {
                tracing::trace!(operation = entry.name(), "no argument finitization; skipped");
                continue;
            };
            if domains.len() != entry.arity() {
                return Err(EngineError::ArityMismatch {
                    operation: format!("{}.{}", registry.type_name(ty)?, entry.name()),
                    expected: entry.arity(),
                    got: domains.len(),
                }
                .into());
            }
            targets.push(Target {
                op,
                name: entry.name(),
                domains,
            });
        }
        Ok(targets)
    }

    fn process_candidate(
        &mut self,
        invoice: &mut Invoice,
        mut candidate: Instance,
        assignment: &FieldAssignment,
        targets: &[Target<'a>],
    ) -> Result<(), BetError> {
        let registry = self.registry;
        for target in targets {
            tracing::trace!(
                phase = %Phase::MethodEnumeration,
                operation = target.name,
                "enumerating arguments"
            );
            let contract = registry.contract(target.op)?;
            let guarded = contract.has_precondition();
            if !guarded && self.config.audit_missing_preconditions {
                invoice.log.push(LogEntry::NoPrecondition {
                    type_name: invoice.type_name.clone(),
                    operation: target.name.to_string(),
                });
            }

            for args in combinations(target.domains, self.config.argument_scope) {
                invoice.call_candidates += 1;
                self.notify(true, invoice, target, &args, &candidate)?;

                let accepted = !guarded || {
                    let copy = registry.snapshot(&candidate)?;
                    contract.preconditions_hold(&copy, &args)
                };
                if accepted {
                    self.attempt(invoice, &mut candidate, assignment, target, &args)?;
                } else {
                    tracing::trace!(
                        phase = %Phase::PreconditionFilter,
                        operation = target.name,
                        "rejected"
                    );
                    invoice.precondition_violations += 1;
                }

                self.notify(false, invoice, target, &args, &candidate)?;
            }
        }
        Ok(())
    }

    /// Invokes the operation on the live candidate and classifies the result.
    fn attempt(
        &self,
        invoice: &mut Invoice,
        candidate: &mut Instance,
        assignment: &FieldAssignment,
        target: &Target<'a>,
        args: &[Value],
    ) -> Result<(), BetError> {
        tracing::trace!(phase = %Phase::Invoke, operation = target.name, "calling");
        let outcome = self.registry.invoke(target.op, candidate, args);
        match outcome {
            Ok(_) => {
                invoice.successes += 1;
                Ok(())
            }
            Err(CallError::Violation(violation)) => {
                tracing::debug!(phase = %Phase::Classify, kind = %violation.kind(), "{violation}");
                invoice.failures += 1;
                invoice.failure_kinds.record(violation.kind());
                invoice.log.push(LogEntry::Failure {
                    type_name: invoice.type_name.clone(),
                    initialization: assignment.clone(),
                    operation: target.name.to_string(),
                    arguments: args.to_vec(),
                    kind: violation.kind(),
                    reason: violation.description(),
                });
                Ok(())
            }
            Err(CallError::Raised(exception)) => Err(BetError::UncaughtException {
                type_name: invoice.type_name.clone(),
                operation: target.name.to_string(),
                category: self.registry.exceptions().name(exception.class).to_string(),
                message: exception.message,
            }),
            Err(CallError::Engine(e)) => Err(e.into()),
        }
    }

    fn notify(
        &mut self,
        before: bool,
        invoice: &Invoice,
        target: &Target<'a>,
        args: &[Value],
        candidate: &Instance,
    ) -> Result<(), BetError> {
        let Some(hook) = self.hook.as_mut() else {
            return Ok(());
        };
        let attempt = Attempt {
            type_name: &invoice.type_name,
            operation: target.name,
            arguments: args,
            candidate,
        };
        if before {
            hook.before_attempt(&attempt)?;
        } else {
            hook.after_attempt(&attempt)?;
        }
        Ok(())
    }
}
