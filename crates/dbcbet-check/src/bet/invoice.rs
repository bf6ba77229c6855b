//! The outcome report of one bounded-exhaustive run.

use std::fmt;

use serde::{Deserialize, Serialize};

use dbcbet_core::{display_values, Value};

use crate::contracts::ContractKind;
use crate::finitize::{format_assignment, FieldAssignment};

/// Failures broken down by violation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub precondition: u64,
    pub postcondition: u64,
    pub invariant: u64,
    pub throws: u64,
}

impl ViolationCounts {
    pub fn record(&mut self, kind: ContractKind) {
        match kind {
            ContractKind::Precondition => self.precondition += 1,
            ContractKind::Postcondition => self.postcondition += 1,
            ContractKind::Invariant => self.invariant += 1,
            ContractKind::Throws => self.throws += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.precondition + self.postcondition + self.invariant + self.throws
    }
}

/// One entry of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LogEntry {
    /// A call on a candidate ended in a contract violation.
    Failure {
        type_name: String,
        initialization: FieldAssignment,
        operation: String,
        arguments: Vec<Value>,
        kind: ContractKind,
        reason: String,
    },
    /// An operation with no precondition was called unconditionally.
    NoPrecondition { type_name: String, operation: String },
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Failure {
                type_name,
                initialization,
                operation,
                arguments,
                reason,
                ..
            } => write!(
                f,
                "instance of {type_name} with initialization {} failed when calling {operation} with arguments {}. Reason: {reason}",
                format_assignment(initialization),
                display_values(arguments)
            ),
            LogEntry::NoPrecondition { operation, .. } => {
                write!(f, "No precondition found when attempting to call {operation}")
            }
        }
    }
}

/// Aggregate counters and log of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Type under test.
    pub type_name: String,
    /// Candidates that passed the invariant filter.
    pub candidates: u64,
    /// Candidates discarded by the invariant filter.
    pub invariant_violations: u64,
    /// Argument combinations attempted across all operations.
    pub call_candidates: u64,
    /// Combinations rejected by the precondition filter.
    pub precondition_violations: u64,
    /// Calls that ended in a contract violation.
    pub failures: u64,
    /// Calls that returned normally with every check passing.
    pub successes: u64,
    /// `failures` by violation kind.
    pub failure_kinds: ViolationCounts,
    /// Failures and audit entries, in the order they occurred.
    pub log: Vec<LogEntry>,
}

impl Invoice {
    pub fn new(type_name: impl Into<String>) -> Self {
        Invoice {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Descriptions of the failure entries only.
    pub fn failure_descriptions(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|entry| matches!(entry, LogEntry::Failure { .. }))
            .map(ToString::to_string)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}
