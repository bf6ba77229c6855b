//! Declaration-level enums shared by the registry and the test driver.

use serde::{Deserialize, Serialize};

/// Reserved operation name for constructors.
pub const CONSTRUCTOR: &str = "init";

/// Visibility of an operation. Private operations are never intercepted
/// and never take part in contract composition or enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// The role an operation plays on its type.
///
/// Everything except [`OperationKind::Method`] is externally observable by
/// construction, so those kinds are public for contract purposes regardless
/// of the declared [`Visibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Instance construction (runs on a bare instance).
    Constructor,
    /// An ordinary operation.
    Method,
    /// Structural equality.
    Equality,
    /// Hashing.
    Hash,
    /// String conversion.
    Display,
}

impl OperationKind {
    /// Whether this kind is public no matter what visibility was declared.
    pub fn always_public(self) -> bool {
        !matches!(self, OperationKind::Method)
    }

    /// Effective visibility for contract purposes.
    pub fn is_public(self, declared: Visibility) -> bool {
        self.always_public() || declared == Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_method_is_not_public() {
        assert!(!OperationKind::Method.is_public(Visibility::Private));
        assert!(OperationKind::Method.is_public(Visibility::Public));
    }

    #[test]
    fn observable_kinds_are_always_public() {
        for kind in [
            OperationKind::Constructor,
            OperationKind::Equality,
            OperationKind::Hash,
            OperationKind::Display,
        ] {
            assert!(kind.is_public(Visibility::Private), "{kind:?}");
        }
    }
}
