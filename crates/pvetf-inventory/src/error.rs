//! Error types for pvetf-inventory

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building an inventory
///
/// Every variant is fatal for the run: nothing is retried and no partial
/// inventory is produced.
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Terraform binary is missing on this host
    #[error("terraform binary not found: {0}")]
    TerraformNotFound(String),

    /// Terraform exited with a non-zero status
    #[error("`{command}` failed in {} with status {status}: {stderr}", .path.display())]
    CommandFailed {
        /// Project path the command ran in
        path: PathBuf,
        /// Command line that failed
        command: String,
        /// Exit status code
        status: i32,
        /// Trimmed stderr output
        stderr: String,
    },

    /// Terraform could not be executed at all
    #[error("execution error in {}: {message}", .path.display())]
    Execution {
        /// Project path the command was meant to run in
        path: PathBuf,
        /// Underlying executor error
        message: String,
    },

    /// Terraform output was not valid JSON
    #[error("unparseable state output from {}: {message}", .path.display())]
    Parse {
        /// Project path that produced the output
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// State document has an unexpected shape
    #[error("malformed state document: {0}")]
    MalformedState(String),

    /// A compute resource has attribute values of the wrong shape
    #[error("malformed resource {address}: {reason}")]
    MalformedResource {
        /// Terraform address of the resource
        address: String,
        /// What was wrong with it
        reason: String,
    },

    /// No network device or interface is attached to the configured bridge
    #[error("resource {resource} has no network device on bridge {bridge}")]
    NoMatchingDevice {
        /// Declared resource name
        resource: String,
        /// Configured bridge interface
        bridge: String,
    },

    /// The matched device has no reported IPv4 address
    #[error("resource {resource} reports no IPv4 address for {device}")]
    AddressNotFound {
        /// Declared resource name
        resource: String,
        /// MAC address or interface name that was looked up
        device: String,
    },

    /// Two resources resolved to the same inventory hostname
    #[error("found duplicate host: {0}")]
    DuplicateHost(String),
}

impl InventoryError {
    /// Check if error stems from configuration rather than state
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, InventoryError::Config(_))
    }

    /// Check if error was raised while resolving a resource's network identity
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            InventoryError::NoMatchingDevice { .. } | InventoryError::AddressNotFound { .. }
        )
    }

    /// Check if error was raised while fetching state from Terraform
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            InventoryError::TerraformNotFound(_)
                | InventoryError::CommandFailed { .. }
                | InventoryError::Execution { .. }
                | InventoryError::Parse { .. }
        )
    }
}
