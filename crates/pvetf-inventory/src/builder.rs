//! Inventory building
//!
//! Turns resource records into sink registrations: resolves each record's
//! hostname and address, works out its groups and variables under the
//! configured exclusions and overrides, and enforces hostname uniqueness for
//! the whole run.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::config::{ResolutionConfig, Scalar, Variables};
use crate::error::InventoryError;
use crate::network::{resolve_address, resolve_hostname};
use crate::sink::InventorySink;
use crate::types::{ResolvedHost, ResourceRecord};

/// Counters for one builder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Compute resources handed to the builder
    pub resources: usize,
    /// Hosts registered with the sink
    pub hosts_added: usize,
    /// Hosts skipped by `exclude_hosts` or because all their groups were excluded
    pub hosts_excluded: usize,
    /// State sources that held no resources
    pub empty_states: usize,
}

/// Group candidates of one host, split by origin
struct Candidates {
    /// Tag, node and extra groups
    selectable: Vec<String>,
    /// Kind marker group
    marker: &'static str,
}

/// Builds an inventory from resource records
///
/// One builder covers one run. It remembers which groups it created and which
/// hostnames it registered, so state from several projects can be fed in
/// sequence and duplicates across them are still caught.
pub struct InventoryBuilder<'a> {
    config: &'a ResolutionConfig,
    known_groups: HashSet<String>,
    known_hosts: HashSet<String>,
    summary: BuildSummary,
}

impl<'a> InventoryBuilder<'a> {
    /// Create a builder for one run
    #[must_use]
    pub fn new(config: &'a ResolutionConfig) -> Self {
        Self {
            config,
            known_groups: HashSet::new(),
            known_hosts: HashSet::new(),
            summary: BuildSummary::default(),
        }
    }

    /// Counters so far
    #[must_use]
    pub fn summary(&self) -> BuildSummary {
        self.summary
    }

    /// Add the records extracted from one state source
    ///
    /// `None` stands for a project without state and contributes nothing.
    ///
    /// # Errors
    /// Stops at the first record that fails to resolve or duplicates an
    /// earlier hostname.
    #[instrument(skip_all, fields(records = records.as_ref().map_or(0, Vec::len)))]
    pub fn add_state<S: InventorySink>(
        &mut self,
        records: Option<Vec<ResourceRecord>>,
        sink: &mut S,
    ) -> Result<(), InventoryError> {
        let Some(records) = records else {
            debug!("empty state, nothing to add");
            self.summary.empty_states += 1;
            return Ok(());
        };

        for record in &records {
            self.add_record(record, sink)?;
        }

        info!(
            hosts_added = self.summary.hosts_added,
            hosts_excluded = self.summary.hosts_excluded,
            "state added to inventory"
        );

        Ok(())
    }

    /// Resolve a record and register it with the sink
    ///
    /// Returns the registered host, or `None` when the host was excluded.
    ///
    /// # Errors
    /// Returns a resolution error from [`resolve_address`], or
    /// [`InventoryError::DuplicateHost`] if the hostname was registered earlier
    /// in this run. Nothing is written to the sink in either case.
    pub fn add_record<S: InventorySink>(
        &mut self,
        record: &ResourceRecord,
        sink: &mut S,
    ) -> Result<Option<ResolvedHost>, InventoryError> {
        self.summary.resources += 1;

        let Some(host) = resolve_host(record, self.config)? else {
            self.summary.hosts_excluded += 1;
            return Ok(None);
        };

        if self.known_hosts.contains(&host.hostname) {
            return Err(InventoryError::DuplicateHost(host.hostname));
        }

        self.emit(&host, sink);
        self.known_hosts.insert(host.hostname.clone());
        self.summary.hosts_added += 1;

        Ok(Some(host))
    }

    fn emit<S: InventorySink>(&mut self, host: &ResolvedHost, sink: &mut S) {
        for group in &host.groups {
            if self.known_groups.insert(group.clone()) {
                sink.add_group(group);
                if let Some(vars) = self.config.group_overrides(group) {
                    for (key, value) in vars {
                        sink.set_variable(group, key, value);
                    }
                }
            }
        }

        sink.add_host(&host.hostname);
        for group in &host.groups {
            sink.add_child(group, &host.hostname);
        }
        for (key, value) in &host.variables {
            sink.set_variable(&host.hostname, key, value);
        }

        debug!(host = %host.hostname, groups = ?host.groups, "registered host");
    }
}

/// Resolve a record into a host, applying exclusions and overrides
///
/// Returns `Ok(None)` if the hostname is excluded, or if every tag, node and
/// extra group of the host is excluded. The kind marker group alone never
/// keeps a host in the inventory once its other groups are gone.
///
/// # Errors
/// Propagates resolution errors from [`resolve_address`].
pub fn resolve_host(
    record: &ResourceRecord,
    config: &ResolutionConfig,
) -> Result<Option<ResolvedHost>, InventoryError> {
    let kind = record.kind();
    let hostname = resolve_hostname(record, config.domain());
    let address = resolve_address(record, config.bridge_iface(), config.dns_only())?;

    if config.is_host_excluded(&hostname) {
        debug!(host = %hostname, "host excluded by name");
        return Ok(None);
    }

    let candidates = candidate_groups(record, config);
    let selectable_left = candidates
        .selectable
        .iter()
        .filter(|g| !config.is_group_excluded(g))
        .count();
    let marker_left = !config.is_group_excluded(candidates.marker);

    let all_selectable_excluded = !candidates.selectable.is_empty() && selectable_left == 0;
    if all_selectable_excluded || (selectable_left == 0 && !marker_left) {
        debug!(host = %hostname, "every group of host excluded");
        return Ok(None);
    }

    let groups: Vec<String> = candidates
        .selectable
        .into_iter()
        .chain(std::iter::once(candidates.marker.to_string()))
        .filter(|g| !config.is_group_excluded(g))
        .collect();

    let mut variables = Variables::new();
    if let Some(addr) = &address {
        variables.insert("ansible_host".to_string(), Scalar::from(addr.as_str()));
    }
    variables.insert("type".to_string(), Scalar::from(kind.type_var()));
    if let Some(overrides) = config.host_overrides(&hostname) {
        variables.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Ok(Some(ResolvedHost {
        hostname,
        address,
        kind,
        groups,
        variables,
    }))
}

/// Tag groups, then the node group, then extra groups, deduplicated
fn candidate_groups(record: &ResourceRecord, config: &ResolutionConfig) -> Candidates {
    let mut seen = HashSet::new();
    let mut selectable = Vec::new();

    let tags = record.tags.iter().map(|tag| format!("tag_{tag}"));
    let node = config
        .use_node_groups()
        .then(|| format!("proxmox_{}", record.node_name));
    let extra = config.extra_groups().iter().cloned();

    for group in tags.chain(node).chain(extra) {
        if seen.insert(group.clone()) {
            selectable.push(group);
        }
    }

    let marker = record.kind().group_name();
    selectable.retain(|g| g != marker);

    Candidates { selectable, marker }
}
