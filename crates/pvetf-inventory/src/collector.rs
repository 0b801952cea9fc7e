//! High-level inventory collection API

use std::sync::Arc;

use pvetf_exec::CommandExecutor;
use tracing::{debug, info, instrument};

use crate::builder::{BuildSummary, InventoryBuilder};
use crate::config::ResolutionConfig;
use crate::error::InventoryError;
use crate::sink::InventorySink;
use crate::terraform::TerraformClient;

/// Inventory collector
///
/// Reads every configured project in order and feeds the results through a
/// single [`InventoryBuilder`], so duplicate hostnames across projects are
/// rejected.
pub struct InventoryCollector<'a> {
    config: &'a ResolutionConfig,
    client: TerraformClient,
}

impl<'a> InventoryCollector<'a> {
    /// Create a new inventory collector
    pub fn new(config: &'a ResolutionConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let client = TerraformClient::new(executor, config.terraform_binary())
            .with_refresh(config.refresh());
        Self { config, client }
    }

    /// Collect the inventory of all projects into `sink`
    ///
    /// # Errors
    /// Returns the first fetch, extraction, resolution or duplicate-host error.
    /// The sink may hold registrations from earlier projects at that point and
    /// should be discarded.
    #[instrument(skip_all, fields(projects = self.config.project_paths().len()))]
    pub async fn collect<S: InventorySink>(
        &self,
        sink: &mut S,
    ) -> Result<BuildSummary, InventoryError> {
        debug!(executor = self.client.executor_type(), "collecting inventory");
        self.client.ensure_available().await?;

        let mut builder = InventoryBuilder::new(self.config);
        for path in self.config.project_paths() {
            let records = self
                .client
                .resources(path, self.config.search_child_modules())
                .await?;
            builder.add_state(records, sink)?;
        }

        let summary = builder.summary();
        info!(
            resources = summary.resources,
            hosts = summary.hosts_added,
            excluded = summary.hosts_excluded,
            "inventory collection completed"
        );

        Ok(summary)
    }
}
