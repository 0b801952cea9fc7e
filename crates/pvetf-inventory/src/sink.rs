//! Inventory sink
//!
//! [`InventorySink`] is the registration surface the builder writes to. The
//! in-memory [`Inventory`] implements it and renders the Ansible dynamic
//! inventory JSON format.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value, json};

use crate::config::{Scalar, Variables};

/// Receiver of inventory registrations
///
/// Every call must be idempotent: repeating an identical call changes nothing.
pub trait InventorySink {
    /// Register a group
    fn add_group(&mut self, group: &str);

    /// Register a host
    fn add_host(&mut self, host: &str);

    /// Make `host` a member of `group`
    fn add_child(&mut self, group: &str, host: &str);

    /// Set a variable on a host or group
    fn set_variable(&mut self, target: &str, key: &str, value: &Scalar);
}

#[derive(Debug, Clone, Default, PartialEq)]
struct GroupEntry {
    hosts: Vec<String>,
    vars: Variables,
}

/// In-memory inventory
///
/// Groups and hosts keep registration order. Variables set on a name that is
/// both a host and a group land on the host, as with Ansible's own inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    group_order: Vec<String>,
    groups: BTreeMap<String, GroupEntry>,
    host_order: Vec<String>,
    hosts: BTreeMap<String, Variables>,
}

impl Inventory {
    /// Create an empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Group names in registration order
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.group_order
    }

    /// Host names in registration order
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.host_order
    }

    /// Members of a group, in insertion order
    #[must_use]
    pub fn group_hosts(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(|g| g.hosts.as_slice())
    }

    #[must_use]
    pub fn group_vars(&self, group: &str) -> Option<&Variables> {
        self.groups.get(group).map(|g| &g.vars)
    }

    #[must_use]
    pub fn host_vars(&self, host: &str) -> Option<&Variables> {
        self.hosts.get(host)
    }

    /// Groups `host` is a member of
    #[must_use]
    pub fn groups_of(&self, host: &str) -> Vec<&str> {
        self.group_order
            .iter()
            .filter(|name| {
                self.groups
                    .get(name.as_str())
                    .is_some_and(|g| g.hosts.iter().any(|h| h == host))
            })
            .map(String::as_str)
            .collect()
    }

    /// Render the `--list` document
    ///
    /// Groups carry their `hosts` and `vars`, `all.children` lists every group
    /// and `_meta.hostvars` carries the host variables, so Ansible does not
    /// call back once per host.
    #[must_use]
    pub fn to_list_json(&self) -> Value {
        let mut root = Map::new();

        for name in &self.group_order {
            let Some(group) = self.groups.get(name) else {
                continue;
            };
            let mut entry = Map::new();
            entry.insert("hosts".to_string(), json!(group.hosts));
            if !group.vars.is_empty() {
                entry.insert("vars".to_string(), vars_json(&group.vars));
            }
            root.insert(name.clone(), Value::Object(entry));
        }

        let grouped: BTreeSet<&str> = self
            .groups
            .values()
            .flat_map(|g| g.hosts.iter().map(String::as_str))
            .collect();
        let ungrouped: Vec<&str> = self
            .host_order
            .iter()
            .map(String::as_str)
            .filter(|h| !grouped.contains(h))
            .collect();

        let mut all = Map::new();
        all.insert("children".to_string(), json!(self.group_order));
        if !ungrouped.is_empty() {
            all.insert("hosts".to_string(), json!(ungrouped));
        }
        root.insert("all".to_string(), Value::Object(all));

        let hostvars: Map<String, Value> = self
            .host_order
            .iter()
            .map(|h| (h.clone(), self.host_json(h)))
            .collect();
        root.insert("_meta".to_string(), json!({ "hostvars": hostvars }));

        Value::Object(root)
    }

    /// Render the `--host` document, empty for unknown hosts
    #[must_use]
    pub fn host_json(&self, host: &str) -> Value {
        self.hosts
            .get(host)
            .map_or_else(|| json!({}), vars_json)
    }
}

fn vars_json(vars: &Variables) -> Value {
    Value::Object(
        vars.iter()
            .map(|(k, v)| (k.clone(), scalar_json(v)))
            .collect(),
    )
}

fn scalar_json(value: &Scalar) -> Value {
    match value {
        Scalar::Bool(v) => json!(v),
        Scalar::Int(v) => json!(v),
        Scalar::Float(v) => json!(v),
        Scalar::Str(v) => json!(v),
    }
}

impl InventorySink for Inventory {
    fn add_group(&mut self, group: &str) {
        if !self.groups.contains_key(group) {
            self.groups.insert(group.to_string(), GroupEntry::default());
            self.group_order.push(group.to_string());
        }
    }

    fn add_host(&mut self, host: &str) {
        if !self.hosts.contains_key(host) {
            self.hosts.insert(host.to_string(), Variables::new());
            self.host_order.push(host.to_string());
        }
    }

    fn add_child(&mut self, group: &str, host: &str) {
        self.add_group(group);
        self.add_host(host);
        if let Some(entry) = self.groups.get_mut(group)
            && !entry.hosts.iter().any(|h| h == host)
        {
            entry.hosts.push(host.to_string());
        }
    }

    fn set_variable(&mut self, target: &str, key: &str, value: &Scalar) {
        if let Some(vars) = self.hosts.get_mut(target) {
            vars.insert(key.to_string(), value.clone());
        } else if let Some(group) = self.groups.get_mut(target) {
            group.vars.insert(key.to_string(), value.clone());
        } else {
            tracing::warn!(name = target, key, "variable set on unknown host or group");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_idempotent_calls() {
        let mut inv = Inventory::new();
        inv.add_group("tag_web");
        inv.add_group("tag_web");
        inv.add_host("web1");
        inv.add_host("web1");
        inv.add_child("tag_web", "web1");
        inv.add_child("tag_web", "web1");

        assert_eq!(inv.groups(), ["tag_web".to_string()]);
        assert_eq!(inv.hosts(), ["web1".to_string()]);
        assert_eq!(inv.group_hosts("tag_web").unwrap(), ["web1".to_string()]);
        assert_eq!(inv.groups_of("web1"), vec!["tag_web"]);
    }

    #[test]
    fn test_list_json() {
        let mut inv = Inventory::new();
        inv.add_group("proxmox_lxc");
        inv.set_variable("proxmox_lxc", "ansible_user", &Scalar::from("root"));
        inv.add_host("dns1");
        inv.add_child("proxmox_lxc", "dns1");
        inv.set_variable("dns1", "ansible_host", &Scalar::from("10.0.0.20"));
        inv.set_variable("dns1", "port", &Scalar::Int(22));
        inv.add_host("loner");

        let expected = json!({
            "proxmox_lxc": {
                "hosts": ["dns1"],
                "vars": {"ansible_user": "root"}
            },
            "all": {
                "children": ["proxmox_lxc"],
                "hosts": ["loner"]
            },
            "_meta": {
                "hostvars": {
                    "dns1": {"ansible_host": "10.0.0.20", "port": 22},
                    "loner": {}
                }
            }
        });
        assert_eq!(inv.to_list_json(), expected);
        assert_eq!(inv.host_json("dns1")["port"], json!(22));
        assert_eq!(inv.host_json("missing"), json!({}));
    }
}
