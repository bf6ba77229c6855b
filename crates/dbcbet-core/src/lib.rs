pub mod error;
pub mod exception;
pub mod id;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::CoreError;
pub use exception::{Exception, ExceptionClass, ExceptionHierarchy};
pub use id::{ExceptionId, OperationId, TypeId};
pub use types::{OperationKind, Visibility, CONSTRUCTOR};
pub use value::{display_values, Instance, Value, ValueKind};
