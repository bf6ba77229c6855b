//! Exception categories and the raised-exception value.
//!
//! Operations report domain failures by raising an [`Exception`] whose
//! category lives in an [`ExceptionHierarchy`]. Categories form a tree rooted
//! at [`ExceptionId::EXCEPTION`]; allowed-exception checks are subtype checks
//! along that tree.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::ExceptionId;

/// A declared exception category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionClass {
    pub id: ExceptionId,
    pub name: String,
    /// `None` only for the root category.
    pub parent: Option<ExceptionId>,
}

/// Pre-registered ExceptionId constants for built-in categories.
impl ExceptionId {
    pub const EXCEPTION: ExceptionId = ExceptionId(0);
    pub const TYPE_ERROR: ExceptionId = ExceptionId(1);
    pub const VALUE_ERROR: ExceptionId = ExceptionId(2);
    pub const ARITHMETIC_ERROR: ExceptionId = ExceptionId(3);
    pub const ZERO_DIVISION_ERROR: ExceptionId = ExceptionId(4);
}

/// Registry of exception categories with single-parent subtyping.
///
/// On construction the hierarchy pre-registers:
/// - `ExceptionId(0)` = Exception (root)
/// - `ExceptionId(1)` = TypeError
/// - `ExceptionId(2)` = ValueError
/// - `ExceptionId(3)` = ArithmeticError
/// - `ExceptionId(4)` = ZeroDivisionError (subtype of ArithmeticError)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHierarchy {
    classes: Vec<ExceptionClass>,
    names: HashMap<String, ExceptionId>,
}

impl ExceptionHierarchy {
    pub fn new() -> Self {
        let mut hierarchy = ExceptionHierarchy {
            classes: Vec::new(),
            names: HashMap::new(),
        };
        hierarchy.push("Exception", None);
        hierarchy.push("TypeError", Some(ExceptionId::EXCEPTION));
        hierarchy.push("ValueError", Some(ExceptionId::EXCEPTION));
        hierarchy.push("ArithmeticError", Some(ExceptionId::EXCEPTION));
        hierarchy.push("ZeroDivisionError", Some(ExceptionId::ARITHMETIC_ERROR));
        hierarchy
    }

    fn push(&mut self, name: &str, parent: Option<ExceptionId>) -> ExceptionId {
        let id = ExceptionId(self.classes.len() as u32);
        self.classes.push(ExceptionClass {
            id,
            name: name.to_string(),
            parent,
        });
        self.names.insert(name.to_string(), id);
        id
    }

    /// Declares a new category under `parent`.
    pub fn declare(&mut self, name: &str, parent: ExceptionId) -> Result<ExceptionId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateExceptionName {
                name: name.to_string(),
            });
        }
        self.get(parent)?;
        Ok(self.push(name, Some(parent)))
    }

    pub fn get(&self, id: ExceptionId) -> Result<&ExceptionClass, CoreError> {
        self.classes
            .get(id.index())
            .ok_or(CoreError::ExceptionNotFound { id })
    }

    /// Category name, or `"<unknown>"` for ids from another hierarchy.
    pub fn name(&self, id: ExceptionId) -> &str {
        self.classes
            .get(id.index())
            .map(|c| c.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn lookup(&self, name: &str) -> Option<ExceptionId> {
        self.names.get(name).copied()
    }

    /// True if `sub` equals `sup` or descends from it.
    pub fn is_subclass(&self, sub: ExceptionId, sup: ExceptionId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.classes.get(id.index()).and_then(|c| c.parent);
        }
        false
    }

    /// True if `category` equals or subtypes some member of `allowed`.
    pub fn covered_by(&self, category: ExceptionId, allowed: &[ExceptionId]) -> bool {
        allowed.iter().any(|sup| self.is_subclass(category, *sup))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ExceptionHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

/// A raised domain exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub class: ExceptionId,
    pub message: String,
}

impl Exception {
    pub fn new(class: ExceptionId, message: impl Into<String>) -> Self {
        Exception {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception category {}: {}", self.class, self.message)
    }
}
