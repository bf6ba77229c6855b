//! Core error types for dbcbet-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! lookups and declarations against the type and exception registries.

use crate::id::{ExceptionId, OperationId, TypeId};
use thiserror::Error;

/// Core errors produced by declaration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Attempting to declare a type name that already exists.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// Attempting to declare an exception category name that already exists.
    #[error("duplicate exception category: '{name}'")]
    DuplicateExceptionName { name: String },

    /// A type declares the same operation name twice.
    #[error("duplicate operation '{operation}' on type '{type_name}'")]
    DuplicateOperation { type_name: String, operation: String },

    /// A TypeId was not found in the registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// An OperationId was not found in the registry.
    #[error("operation not found: OperationId({id})", id = id.0)]
    OperationNotFound { id: OperationId },

    /// An ExceptionId was not found in the hierarchy.
    #[error("exception category not found: ExceptionId({id})", id = id.0)]
    ExceptionNotFound { id: ExceptionId },

    /// The declared base types form a cycle.
    #[error("inheritance cycle through type '{type_name}'")]
    InheritanceCycle { type_name: String },
}
