//! Error types for contract declaration, checked calls, and test runs.
//!
//! [`CallError`] is what every checked call returns on failure. It keeps the
//! three sources apart: contract violations (classified by the test driver),
//! domain exceptions raised by operation bodies, and engine failures (the
//! checking machinery itself broke, never classified).

use dbcbet_core::{CoreError, Exception, ExceptionId};

use crate::contracts::ContractViolation;

/// A contract was declared in a way that can never be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractDeclarationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A subtype override allows a category its supertype does not.
    #[error(
        "{derived}.{operation} allows {category}, which is neither equal to nor a subtype of any exception allowed by {base}.{operation}"
    )]
    WidenedExceptions {
        derived: String,
        base: String,
        operation: String,
        category: String,
    },

    /// The precondition of this operation is final.
    #[error("precondition of {type_name}.{operation} is final and cannot be modified")]
    FinalPrecondition { type_name: String, operation: String },
}

/// The checking machinery failed. Always fatal, never classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("snapshot of {type_name} failed: {reason}")]
    SnapshotFailed { type_name: String, reason: String },

    #[error("{operation} takes {expected} argument(s), got {got}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("type {type_name} has no operation '{operation}'")]
    UnknownOperation { type_name: String, operation: String },
}

/// Failure of a single (checked or raw) call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// A member of the violation taxonomy. Propagates through nested checked
    /// calls untouched.
    #[error(transparent)]
    Violation(Box<ContractViolation>),

    /// A domain exception raised by an operation body.
    #[error("raised {0}")]
    Raised(Exception),

    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
}

impl CallError {
    /// Raises a domain exception of the given category.
    pub fn raise(class: ExceptionId, message: impl Into<String>) -> Self {
        CallError::Raised(Exception::new(class, message))
    }

    /// Shorthand for a built-in `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::raise(ExceptionId::TYPE_ERROR, message)
    }

    pub fn violation(&self) -> Option<&ContractViolation> {
        match self {
            CallError::Violation(v) => Some(v),
            _ => None,
        }
    }

    /// True for a precondition violation (a caller error).
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, CallError::Violation(v) if matches!(**v, ContractViolation::Precondition(_)))
    }
}

impl From<ContractViolation> for CallError {
    fn from(v: ContractViolation) -> Self {
        CallError::Violation(Box::new(v))
    }
}

impl From<CoreError> for CallError {
    fn from(e: CoreError) -> Self {
        CallError::Engine(EngineError::Core(e))
    }
}

/// Errors from an external-state hook. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        HookError {
            message: message.into(),
        }
    }
}

/// Fatal aborts of a bounded-exhaustive run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BetError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),

    /// A candidate could not be built from its finitization.
    #[error("failed to build a candidate of {type_name}: {source}")]
    Construction {
        type_name: String,
        #[source]
        source: CallError,
    },

    /// A domain exception escaped a call without being translated into a
    /// violation.
    #[error("{type_name}.{operation} raised {category} outside the contract taxonomy: {message}")]
    UncaughtException {
        type_name: String,
        operation: String,
        category: String,
        message: String,
    },

    #[error("external state hook failed: {0}")]
    Hook(#[from] HookError),
}
