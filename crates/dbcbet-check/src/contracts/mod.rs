//! Contract types and the violation taxonomy.
//!
//! A contract attaches precondition groups, postconditions, and allowed
//! exceptions to an operation, and invariants to a type. Every checked call
//! either returns normally or fails with one of four violations:
//!
//! - [`PreconditionViolation`] -- the caller broke the contract; the
//!   operation was not invoked.
//! - [`PostconditionViolation`] -- the implementation did not honor its
//!   declared result.
//! - [`InvariantViolation`] -- the instance is inconsistent after the call.
//! - [`ThrowsViolation`] -- the operation raised an undeclared exception.
//!
//! All four are carried by [`ContractViolation`] so callers can match on the
//! common category or on the specific kind.

pub mod adapters;
pub mod compose;
pub mod intercept;
pub mod predicate;
pub mod registry;
pub mod snapshot;
pub mod spec;

use std::fmt;

use dbcbet_core::{display_values, Exception, Instance, Value};
use serde::{Deserialize, Serialize};

pub use predicate::{Invariant, Postcondition, Precondition};
pub use snapshot::Snapshot;
pub use spec::{ContractSpec, InvariantSpec};

/// The kind of contract that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Checked before the call. A caller error.
    Precondition,
    /// Checked after a normal return. A callee error.
    Postcondition,
    /// Checked after every public call, including construction.
    Invariant,
    /// An exception outside the declared allowed set.
    Throws,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractKind::Precondition => "Precondition",
            ContractKind::Postcondition => "Postcondition",
            ContractKind::Invariant => "Invariant",
            ContractKind::Throws => "Throws",
        };
        f.write_str(s)
    }
}

/// Identity of the operation a violation was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    /// Runtime type of the instance the operation ran on.
    pub type_name: String,
    pub operation: String,
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.operation)
    }
}

/// No precondition group was satisfied. The operation was not invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct PreconditionViolation {
    /// The first failing predicate of each group, in group order. The last
    /// entry belongs to the last group evaluated.
    pub failed: Vec<String>,
    pub instance: Instance,
    pub operation: OperationRef,
    pub arguments: Vec<Value>,
}

/// A postcondition did not hold after a normal return.
#[derive(Debug, Clone, PartialEq)]
pub struct PostconditionViolation {
    pub predicate: String,
    pub instance: Instance,
    pub old: Snapshot,
    pub returned: Value,
    pub operation: OperationRef,
    pub arguments: Vec<Value>,
}

/// A type invariant did not hold after a call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub predicate: String,
    pub instance: Instance,
    pub operation: OperationRef,
    pub arguments: Vec<Value>,
}

/// The operation raised an exception whose category is not allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowsViolation {
    /// The original exception, unchanged.
    pub exception: Exception,
    /// Name of the exception's category.
    pub category: String,
    pub instance: Instance,
    pub operation: OperationRef,
    pub arguments: Vec<Value>,
}

impl fmt::Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Precondition Violation: Instance of {} failed when calling {} with arguments ({}). Contract: {}",
            self.instance.type_name(),
            self.operation.operation,
            display_values(&self.arguments),
            self.failed.join(", ")
        )
    }
}

impl fmt::Display for PostconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Postcondition Violation: Instance of {} failed when calling {} with arguments ({}), old values: {}, return: {}. Contract: {}",
            self.instance.type_name(),
            self.operation.operation,
            display_values(&self.arguments),
            self.old,
            self.returned,
            self.predicate
        )
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant Violation: Instance of {} failed when calling {} with arguments ({}). Contract: {}",
            self.instance.type_name(),
            self.operation.operation,
            display_values(&self.arguments),
            self.predicate
        )
    }
}

impl fmt::Display for ThrowsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Throws Violation: Instance of {} failed when calling {} with arguments ({}). Threw {}: {}",
            self.instance.type_name(),
            self.operation.operation,
            display_values(&self.arguments),
            self.category,
            self.exception.message
        )
    }
}

/// Common category of the four violation kinds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    #[error("{0}")]
    Precondition(PreconditionViolation),
    #[error("{0}")]
    Postcondition(PostconditionViolation),
    #[error("{0}")]
    Invariant(InvariantViolation),
    #[error("{0}")]
    Throws(ThrowsViolation),
}

impl ContractViolation {
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractViolation::Precondition(_) => ContractKind::Precondition,
            ContractViolation::Postcondition(_) => ContractKind::Postcondition,
            ContractViolation::Invariant(_) => ContractKind::Invariant,
            ContractViolation::Throws(_) => ContractKind::Throws,
        }
    }

    /// State of the instance when the violation was detected.
    pub fn instance(&self) -> &Instance {
        match self {
            ContractViolation::Precondition(v) => &v.instance,
            ContractViolation::Postcondition(v) => &v.instance,
            ContractViolation::Invariant(v) => &v.instance,
            ContractViolation::Throws(v) => &v.instance,
        }
    }

    pub fn operation(&self) -> &OperationRef {
        match self {
            ContractViolation::Precondition(v) => &v.operation,
            ContractViolation::Postcondition(v) => &v.operation,
            ContractViolation::Invariant(v) => &v.operation,
            ContractViolation::Throws(v) => &v.operation,
        }
    }

    pub fn arguments(&self) -> &[Value] {
        match self {
            ContractViolation::Precondition(v) => &v.arguments,
            ContractViolation::Postcondition(v) => &v.arguments,
            ContractViolation::Invariant(v) => &v.arguments,
            ContractViolation::Throws(v) => &v.arguments,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// True for the kinds that indicate a bug in the callee.
    pub fn is_callee_bug(&self) -> bool {
        !matches!(self, ContractViolation::Precondition(_))
    }
}

impl From<PreconditionViolation> for ContractViolation {
    fn from(v: PreconditionViolation) -> Self {
        ContractViolation::Precondition(v)
    }
}

impl From<PostconditionViolation> for ContractViolation {
    fn from(v: PostconditionViolation) -> Self {
        ContractViolation::Postcondition(v)
    }
}

impl From<InvariantViolation> for ContractViolation {
    fn from(v: InvariantViolation) -> Self {
        ContractViolation::Invariant(v)
    }
}

impl From<ThrowsViolation> for ContractViolation {
    fn from(v: ThrowsViolation) -> Self {
        ContractViolation::Throws(v)
    }
}
