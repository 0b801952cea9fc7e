//! Resolution settings
//!
//! [`RawConfig`] mirrors the on-disk option names and is what file loaders
//! deserialize into. [`ResolutionConfig`] is the validated, immutable form the
//! builder consumes; the only way to get one is through [`ResolutionConfig::from_raw`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Top-level keys of the `--list` document that cannot name a group
const RESERVED_GROUPS: [&str; 2] = ["all", "_meta"];

/// Scalar variable value as accepted by Ansible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Variables keyed by name, kept sorted so output is stable
pub type Variables = BTreeMap<String, Scalar>;

/// Option that accepts either a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single value
    One(String),
    /// A list of values
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten into a list
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Configuration as written in the inventory source file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Plugin name, accepted for compatibility with Ansible inventory sources
    pub plugin: Option<String>,
    /// One or more Terraform project directories
    pub project_path: Option<OneOrMany>,
    /// Bridge the reachable interface is attached to
    pub bridge_iface: Option<String>,
    /// Whether to walk child modules
    #[serde(default = "default_true")]
    pub search_child_modules: bool,
    /// Whether to group hosts by PVE node
    #[serde(default = "default_true", alias = "use_per_node_groups")]
    pub use_node_groups: bool,
    /// Per-group variables
    #[serde(default)]
    pub group_overrides: BTreeMap<String, Variables>,
    /// Per-host variables
    #[serde(default)]
    pub host_overrides: BTreeMap<String, Variables>,
    /// Hostnames left out of the inventory
    #[serde(default)]
    pub exclude_hosts: Vec<String>,
    /// Groups left out of the inventory
    #[serde(default)]
    pub exclude_groups: Vec<String>,
    /// Groups every host is added to
    #[serde(default)]
    pub extra_group: OneOrMany,
    /// Skip address resolution for containers
    #[serde(default)]
    pub dns_only: bool,
    /// DNS suffix appended to hostnames
    #[serde(default)]
    pub domain: String,
    /// Terraform executable
    #[serde(default = "default_terraform_binary")]
    pub terraform_binary: String,
    /// Run `terraform refresh` before reading state
    #[serde(default = "default_true")]
    pub refresh: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            plugin: None,
            project_path: None,
            bridge_iface: None,
            search_child_modules: true,
            use_node_groups: true,
            group_overrides: BTreeMap::new(),
            host_overrides: BTreeMap::new(),
            exclude_hosts: Vec::new(),
            exclude_groups: Vec::new(),
            extra_group: OneOrMany::default(),
            dns_only: false,
            domain: String::new(),
            terraform_binary: default_terraform_binary(),
            refresh: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_terraform_binary() -> String {
    "terraform".to_string()
}

/// Validated settings for one resolution run
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    project_paths: Vec<PathBuf>,
    bridge_iface: String,
    search_child_modules: bool,
    use_node_groups: bool,
    group_overrides: BTreeMap<String, Variables>,
    host_overrides: BTreeMap<String, Variables>,
    exclude_hosts: HashSet<String>,
    exclude_groups: HashSet<String>,
    extra_groups: Vec<String>,
    dns_only: bool,
    domain: String,
    terraform_binary: String,
    refresh: bool,
}

impl ResolutionConfig {
    /// Validate a raw configuration
    ///
    /// # Errors
    /// Returns [`InventoryError::Config`] if `bridge_iface` is missing or empty,
    /// if `dns_only` is set without a `domain`, or if `domain` starts with a dot.
    pub fn from_raw(raw: RawConfig) -> Result<Self, InventoryError> {
        let bridge_iface = match raw.bridge_iface {
            Some(bridge) if !bridge.trim().is_empty() => bridge,
            _ => {
                return Err(InventoryError::Config(
                    "option 'bridge_iface' is required".to_string(),
                ));
            }
        };

        if raw.dns_only && raw.domain.is_empty() {
            return Err(InventoryError::Config(
                "option 'domain' is required when 'dns_only' is true".to_string(),
            ));
        }

        if raw.domain.starts_with('.') {
            return Err(InventoryError::Config(format!(
                "option 'domain' must not start with a dot: {}",
                raw.domain
            )));
        }

        if raw.terraform_binary.is_empty() {
            return Err(InventoryError::Config(
                "option 'terraform_binary' must not be empty".to_string(),
            ));
        }

        let extra_groups = raw.extra_group.into_vec();
        if let Some(reserved) = extra_groups
            .iter()
            .find(|g| RESERVED_GROUPS.contains(&g.as_str()))
        {
            return Err(InventoryError::Config(format!(
                "option 'extra_group' must not use the reserved name '{reserved}'"
            )));
        }

        let project_paths = match raw.project_path {
            Some(paths) => paths.into_vec().into_iter().map(PathBuf::from).collect(),
            None => vec![PathBuf::from(".")],
        };

        Ok(Self {
            project_paths,
            bridge_iface,
            search_child_modules: raw.search_child_modules,
            use_node_groups: raw.use_node_groups,
            group_overrides: raw.group_overrides,
            host_overrides: raw.host_overrides,
            exclude_hosts: raw.exclude_hosts.into_iter().collect(),
            exclude_groups: raw.exclude_groups.into_iter().collect(),
            extra_groups,
            dns_only: raw.dns_only,
            domain: raw.domain,
            terraform_binary: raw.terraform_binary,
            refresh: raw.refresh,
        })
    }

    /// Terraform project directories, in configuration order
    #[must_use]
    pub fn project_paths(&self) -> &[PathBuf] {
        &self.project_paths
    }

    /// Bridge used to pick the reachable interface
    #[must_use]
    pub fn bridge_iface(&self) -> &str {
        &self.bridge_iface
    }

    #[must_use]
    pub fn search_child_modules(&self) -> bool {
        self.search_child_modules
    }

    #[must_use]
    pub fn use_node_groups(&self) -> bool {
        self.use_node_groups
    }

    /// Variables configured for `group`, if any
    #[must_use]
    pub fn group_overrides(&self, group: &str) -> Option<&Variables> {
        self.group_overrides.get(group)
    }

    /// Variables configured for `host`, if any
    #[must_use]
    pub fn host_overrides(&self, host: &str) -> Option<&Variables> {
        self.host_overrides.get(host)
    }

    #[must_use]
    pub fn is_host_excluded(&self, host: &str) -> bool {
        self.exclude_hosts.contains(host)
    }

    #[must_use]
    pub fn is_group_excluded(&self, group: &str) -> bool {
        self.exclude_groups.contains(group)
    }

    /// Groups every host is added to
    #[must_use]
    pub fn extra_groups(&self) -> &[String] {
        &self.extra_groups
    }

    #[must_use]
    pub fn dns_only(&self) -> bool {
        self.dns_only
    }

    /// DNS suffix without leading dot, empty when unset
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn terraform_binary(&self) -> &str {
        &self.terraform_binary
    }

    #[must_use]
    pub fn refresh(&self) -> bool {
        self.refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bridge: &str) -> RawConfig {
        RawConfig {
            bridge_iface: Some(bridge.to_string()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = ResolutionConfig::from_raw(raw("vmbr0")).unwrap();

        assert_eq!(cfg.project_paths(), [PathBuf::from(".")]);
        assert_eq!(cfg.bridge_iface(), "vmbr0");
        assert!(cfg.search_child_modules());
        assert!(cfg.use_node_groups());
        assert!(cfg.extra_groups().is_empty());
        assert!(!cfg.dns_only());
        assert_eq!(cfg.domain(), "");
        assert_eq!(cfg.terraform_binary(), "terraform");
    }

    #[test]
    fn test_reserved_extra_group_rejected() {
        for name in ["all", "_meta"] {
            let mut config = raw("vmbr0");
            config.extra_group = OneOrMany::Many(vec!["lab".to_string(), name.to_string()]);

            let err = ResolutionConfig::from_raw(config).unwrap_err();
            assert!(err.is_config_error());
            assert!(err.to_string().contains(name));
        }
    }

    #[test]
    fn test_dns_only_requires_domain() {
        let mut config = raw("vmbr0");
        config.dns_only = true;

        let err = ResolutionConfig::from_raw(config).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("domain"));
    }

    #[test]
    fn test_dns_only_with_domain() {
        let mut config = raw("vmbr0");
        config.dns_only = true;
        config.domain = "lab.internal".to_string();

        let cfg = ResolutionConfig::from_raw(config).unwrap();
        assert!(cfg.dns_only());
        assert_eq!(cfg.domain(), "lab.internal");
    }

    #[test]
    fn test_bridge_required() {
        let config = RawConfig {
            bridge_iface: None,
            ..raw("vmbr0")
        };
        assert!(ResolutionConfig::from_raw(config).unwrap_err().is_config_error());
        assert!(ResolutionConfig::from_raw(raw("  ")).is_err());
    }

    #[test]
    fn test_domain_leading_dot_rejected() {
        let mut config = raw("vmbr0");
        config.domain = ".lab".to_string();
        assert!(ResolutionConfig::from_raw(config).is_err());
    }

    #[test]
    fn test_one_or_many_from_json() {
        let config: RawConfig = serde_json::from_str(
            r#"{"bridge_iface":"vmbr1","project_path":"/srv/tf","extra_group":["lab","pve"]}"#,
        )
        .unwrap();
        let cfg = ResolutionConfig::from_raw(config).unwrap();

        assert_eq!(cfg.project_paths(), [PathBuf::from("/srv/tf")]);
        assert_eq!(cfg.extra_groups(), ["lab".to_string(), "pve".to_string()]);
        assert!(cfg.search_child_modules());
        assert!(cfg.refresh());
    }

    #[test]
    fn test_node_group_alias() {
        let config: RawConfig =
            serde_json::from_str(r#"{"bridge_iface":"vmbr1","use_per_node_groups":false}"#)
                .unwrap();
        assert!(!config.use_node_groups);
    }

    #[test]
    fn test_scalar_overrides() {
        let config: RawConfig = serde_json::from_str(
            r#"{
                "bridge_iface": "vmbr1",
                "host_overrides": {"web1": {"role": "frontend", "port": 8080, "primary": true}},
                "exclude_hosts": ["old"]
            }"#,
        )
        .unwrap();
        let cfg = ResolutionConfig::from_raw(config).unwrap();

        let vars = cfg.host_overrides("web1").unwrap();
        assert_eq!(vars["role"], Scalar::from("frontend"));
        assert_eq!(vars["port"], Scalar::Int(8080));
        assert_eq!(vars["primary"], Scalar::Bool(true));
        assert!(cfg.is_host_excluded("old"));
        assert!(!cfg.is_host_excluded("web1"));
        assert!(cfg.group_overrides("tag_web").is_none());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result: Result<RawConfig, _> =
            serde_json::from_str(r#"{"bridge_iface":"vmbr1","bridge_ifaces":"oops"}"#);
        assert!(result.is_err());
    }
}
