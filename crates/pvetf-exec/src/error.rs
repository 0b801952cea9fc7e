//! Error types for pvetf-exec

use thiserror::Error;

/// Errors that can occur while running an external command
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// The program could not be found on `PATH`
    #[error("program not found: {0}")]
    NotFound(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error while waiting for the process
    #[error("I/O error: {0}")]
    IoError(String),

    /// Working directory does not exist or is not a directory
    #[error("invalid working directory: {0}")]
    InvalidWorkingDir(String),
}

impl ExecError {
    /// Check if the program itself is missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::NotFound(_))
    }
}
