//! Configuration loading
//!
//! Reads an inventory source file (TOML, or YAML as Ansible writes them) and
//! validates it into a [`ResolutionConfig`].

use std::path::{Path, PathBuf};

use eyre::{WrapErr, eyre};
use pvetf_inventory::{RawConfig, ResolutionConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PVETF_CONFIG";

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Format::Yaml,
            _ => Format::Toml,
        }
    }
}

fn parse(content: &str, format: Format) -> eyre::Result<RawConfig> {
    let raw = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(raw)
}

/// Load and validate configuration from a file
///
/// # Errors
/// Returns error if the file cannot be read or parsed, or if the options are
/// inconsistent (for example `dns_only` without `domain`).
pub fn load(path: &Path) -> eyre::Result<ResolutionConfig> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
    let raw = parse(&content, Format::from_path(path))
        .wrap_err_with(|| format!("failed to parse config file {}", path.display()))?;

    if let Some(plugin) = &raw.plugin {
        tracing::debug!(plugin = %plugin, "ignoring plugin option");
    }

    let config = ResolutionConfig::from_raw(raw)
        .wrap_err_with(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

/// Config file locations tried when none is given, in order
fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("pvetf.toml"),
        PathBuf::from("pvetf.yml"),
        PathBuf::from("pvetf.yaml"),
        PathBuf::from("/etc/pvetf/pvetf.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pvetf/pvetf.toml"));
    }
    paths
}

/// Find the config file to use
///
/// # Errors
/// Returns error if no config file exists, since `bridge_iface` has no default.
pub fn locate(explicit: Option<&Path>) -> eyre::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    default_paths()
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| eyre!("no config file found; pass --config or set {CONFIG_ENV}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = write_config(
            ".toml",
            r#"
project_path = ["/srv/tf/lab", "/srv/tf/edge"]
bridge_iface = "vmbr1"
extra_group = "homelab"
exclude_groups = ["tag_template"]

[host_overrides.web1]
role = "frontend"
ansible_port = 2222
"#,
        );

        let config = load(file.path()).unwrap();

        assert_eq!(
            config.project_paths(),
            [PathBuf::from("/srv/tf/lab"), PathBuf::from("/srv/tf/edge")]
        );
        assert_eq!(config.bridge_iface(), "vmbr1");
        assert_eq!(config.extra_groups(), ["homelab".to_string()]);
        assert!(config.is_group_excluded("tag_template"));
        let vars = config.host_overrides("web1").unwrap();
        assert_eq!(vars["ansible_port"], pvetf_inventory::Scalar::Int(2222));
    }

    #[test]
    fn test_load_ansible_yaml() {
        let file = write_config(
            ".yml",
            r"
plugin: gmatiukhin.homelab_plugins.pve_terraform_provider
project_path: /srv/tf/lab
bridge_iface: vmbr0
use_per_node_groups: false
dns_only: true
domain: lab.internal
group_overrides:
  proxmox_lxc:
    ansible_user: root
",
        );

        let config = load(file.path()).unwrap();

        assert!(!config.use_node_groups());
        assert!(config.dns_only());
        assert_eq!(config.domain(), "lab.internal");
        assert_eq!(
            config.group_overrides("proxmox_lxc").unwrap()["ansible_user"],
            pvetf_inventory::Scalar::from("root")
        );
    }

    #[test]
    fn test_dns_only_without_domain() {
        let file = write_config(".toml", "bridge_iface = \"vmbr0\"\ndns_only = true\n");

        let err = load(file.path()).unwrap_err();
        assert!(format!("{err:?}").contains("domain"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = write_config(".toml", "bridge_iface = \n");

        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_missing_file() {
        let err = load(Path::new("/nonexistent/pvetf.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pvetf.toml"));
    }

    #[test]
    fn test_locate_explicit() {
        let path = locate(Some(Path::new("inventory.yml"))).unwrap();
        assert_eq!(path, PathBuf::from("inventory.yml"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("noext")), Format::Toml);
    }
}
