//! Terraform client for reading project state

use std::path::Path;
use std::sync::Arc;

use pvetf_exec::{CommandExecutor, Invocation};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::InventoryError;
use crate::state;
use crate::types::ResourceRecord;

/// Terraform client
///
/// Runs `terraform refresh` and `terraform show -json` in a project
/// directory through a [`CommandExecutor`].
pub struct TerraformClient {
    /// Executor for running terraform
    executor: Arc<dyn CommandExecutor>,
    /// Terraform binary name or path
    binary: String,
    /// Whether to refresh state before reading it
    refresh: bool,
}

impl TerraformClient {
    /// Create a new terraform client
    ///
    /// # Arguments
    /// * `executor` - Executor for running commands
    /// * `binary` - Terraform binary name or path
    pub fn new(executor: Arc<dyn CommandExecutor>, binary: impl Into<String>) -> Self {
        Self {
            executor,
            binary: binary.into(),
            refresh: true,
        }
    }

    /// Enable or disable `terraform refresh` before each read
    #[must_use]
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Short name of the executor running terraform
    #[must_use]
    pub fn executor_type(&self) -> &'static str {
        self.executor.executor_type()
    }

    fn invocation(&self, path: &Path, args: &[&str]) -> Invocation {
        Invocation::new(&self.binary)
            .args(args.iter().copied())
            .current_dir(path)
    }

    /// Check that the terraform binary can be run
    ///
    /// # Errors
    /// Returns [`InventoryError::TerraformNotFound`] if running
    /// `terraform version` fails.
    #[instrument(skip(self))]
    pub async fn ensure_available(&self) -> Result<(), InventoryError> {
        let invocation = Invocation::new(&self.binary).arg("version");
        match self.executor.run(&invocation).await {
            Ok(result) if result.success() => {
                debug!(version = %result.stdout.lines().next().unwrap_or_default(), "terraform available");
                Ok(())
            }
            Ok(result) => Err(InventoryError::TerraformNotFound(format!(
                "`{invocation}` exited with status {}",
                result.status
            ))),
            Err(e) => Err(InventoryError::TerraformNotFound(e.to_string())),
        }
    }

    /// Run a terraform subcommand in `path` and return its stdout
    async fn run(&self, path: &Path, args: &[&str]) -> Result<String, InventoryError> {
        let invocation = self.invocation(path, args);

        let result = self
            .executor
            .run(&invocation)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    InventoryError::TerraformNotFound(self.binary.clone())
                } else {
                    InventoryError::Execution {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !result.success() {
            return Err(InventoryError::CommandFailed {
                path: path.to_path_buf(),
                command: invocation.to_string(),
                status: result.status,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result.stdout)
    }

    /// Refresh the state of a project
    ///
    /// # Errors
    /// Returns an error if terraform cannot be run or exits with a non-zero status.
    #[instrument(skip(self))]
    pub async fn refresh(&self, path: &Path) -> Result<(), InventoryError> {
        debug!("refreshing terraform state");
        self.run(path, &["refresh", "-no-color", "-input=false"])
            .await
            .map(|_| ())
    }

    /// Read the state of a project as JSON, refreshing it first if enabled
    ///
    /// # Errors
    /// Returns an error if either command fails or the output is not JSON.
    #[instrument(skip(self))]
    pub async fn show(&self, path: &Path) -> Result<Value, InventoryError> {
        if self.refresh {
            self.refresh(path).await?;
        }

        let stdout = self.run(path, &["show", "-json"]).await?;

        serde_json::from_str(&stdout).map_err(|e| InventoryError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a project and extract its compute resources
    ///
    /// Returns `Ok(None)` for a project without state.
    ///
    /// # Errors
    /// Returns fetch errors from [`TerraformClient::show`] and extraction
    /// errors from [`state::extract`].
    pub async fn resources(
        &self,
        path: &Path,
        include_child_modules: bool,
    ) -> Result<Option<Vec<ResourceRecord>>, InventoryError> {
        let document = self.show(path).await?;
        let records = state::extract(document, include_child_modules)?;

        info!(
            path = %path.display(),
            resources = records.as_ref().map_or(0, Vec::len),
            "read terraform state"
        );

        Ok(records)
    }
}
