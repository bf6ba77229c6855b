//! Old-state snapshots taken immediately before an invocation.

use std::fmt;

use dbcbet_core::{display_values, Instance, Value};

use crate::contracts::registry::ContractRegistry;
use crate::error::EngineError;

/// Independent copy of the pre-call instance and arguments.
///
/// Consumed only by postconditions; discarded once they have been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub instance: Instance,
    pub arguments: Vec<Value>,
}

impl Snapshot {
    /// Copies `instance` and `args` through each type's snapshot capability.
    pub fn capture(
        registry: &ContractRegistry,
        instance: &Instance,
        args: &[Value],
    ) -> Result<Self, EngineError> {
        let instance = registry.snapshot(instance)?;
        let arguments = args
            .iter()
            .map(|arg| match arg {
                Value::Instance(inner) => registry.snapshot(inner).map(Value::from),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot {
            instance,
            arguments,
        })
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "old(self={}, args=[{}])",
            self.instance,
            display_values(&self.arguments)
        )
    }
}
