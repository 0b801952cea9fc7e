//! Local command execution using `tokio::process`

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::{CommandResult, Invocation};
use crate::traits::CommandExecutor;

/// Local command executor
///
/// Spawns the program directly, without a shell, so arguments and paths
/// never need quoting.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self), fields(command = %invocation), level = "debug")]
    async fn execute(&self, invocation: &Invocation) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &invocation.cwd {
            if !dir.is_dir() {
                return Err(ExecError::InvalidWorkingDir(dir.display().to_string()));
            }
            command.current_dir(dir);
        }

        debug!(cwd = ?invocation.cwd, "executing local command");

        let child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExecError::NotFound(invocation.program.clone()),
            _ => ExecError::SpawnError(e.to_string()),
        })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(status = status, duration = ?duration, "command completed");

        if !output.status.success() {
            error!(status = status, stderr = %stderr.trim(), "command failed");
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<CommandResult, ExecError> {
        self.execute(invocation).await
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}
