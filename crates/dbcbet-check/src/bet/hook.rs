//! Extension point for resetting out-of-process state between attempts.

use dbcbet_core::{Instance, Value};

use crate::error::HookError;

/// One call attempt as seen by an [`ExternalStateHook`].
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub type_name: &'a str,
    pub operation: &'a str,
    pub arguments: &'a [Value],
    /// The live candidate: pre-call state before the attempt, post-call
    /// state after it.
    pub candidate: &'a Instance,
}

/// Called synchronously once before and once after every call attempt,
/// including attempts the precondition filter rejects. Any error aborts the
/// run.
pub trait ExternalStateHook {
    fn before_attempt(&mut self, _attempt: &Attempt<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn after_attempt(&mut self, _attempt: &Attempt<'_>) -> Result<(), HookError> {
        Ok(())
    }
}
