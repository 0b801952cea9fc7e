//! Command executor trait

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{CommandResult, Invocation};

/// Runs external programs and captures their output
///
/// A non-zero exit status is not an error at this layer: callers inspect
/// [`CommandResult::success`] and decide what a failure means for them.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run an invocation to completion
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned or its output
    /// cannot be collected.
    async fn run(&self, invocation: &Invocation) -> Result<CommandResult, ExecError>;

    /// Short name of the executor, used in logs
    fn executor_type(&self) -> &'static str;
}
