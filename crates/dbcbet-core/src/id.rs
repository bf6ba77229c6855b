//! Stable ID newtypes for registry entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `TypeId` cannot be accidentally used where an `OperationId` is
//! expected. IDs are dense indices assigned in declaration order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a declared type (a class under contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Identity of a declared operation. Unique across all types of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub u32);

/// Identity of an exception category in an [`ExceptionHierarchy`](crate::ExceptionHierarchy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExceptionId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ExceptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TypeId {
    /// Index into dense per-type storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl OperationId {
    /// Index into dense per-operation storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ExceptionId {
    /// Index into dense per-category storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
