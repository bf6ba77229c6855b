//! Design-by-contract enforcement and bounded-exhaustive testing.
//!
//! # Modules
//!
//! - [`contracts`] -- Violation taxonomy, predicates, contract registry,
//!   inheritance composition, and the invocation interceptor
//! - [`finitize`] -- Finite domains, mixed-radix enumeration, and candidate
//!   construction
//! - [`bet`] -- The bounded-exhaustive test driver and its invoice
//! - [`error`] -- Call, declaration, engine, and run errors

pub mod bet;
pub mod contracts;
pub mod error;
pub mod finitize;

pub use bet::{
    Attempt, Bet, BetConfig, ExternalStateHook, Invoice, LogEntry, Phase, ViolationCounts,
};
pub use contracts::registry::{ContractRegistry, OperationBody, OperationDecl, SnapshotFn};
pub use contracts::{
    ContractKind, ContractSpec, ContractViolation, Invariant, InvariantSpec, OperationRef,
    Postcondition, Precondition, Snapshot,
};
pub use error::{BetError, CallError, ContractDeclarationError, EngineError, HookError};
pub use finitize::{CandidateBuilder, Domain, FieldAssignment, FinitizationRegistry};
