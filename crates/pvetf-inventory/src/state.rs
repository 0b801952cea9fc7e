//! Terraform state documents and resource extraction
//!
//! Both `terraform show -json` shapes are accepted: a state snapshot keeps
//! resources under `values`, a saved plan under `planned_values`. Everything
//! below that key has the same layout, so the plan subtree is simply read in
//! place of the snapshot one.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::InventoryError;
use crate::types::{
    Compute, ContainerInterface, ContainerNetwork, NetworkDevice, ResourceKind, ResourceRecord,
    VmNetwork,
};

/// The `values` (or `planned_values`) subtree of a state document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateValues {
    /// Top of the module tree
    #[serde(default)]
    pub root_module: Module,
}

/// A Terraform module with its resources and nested modules
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Module {
    /// Module address, absent for the root module
    #[serde(default)]
    pub address: Option<String>,
    /// Resources declared directly in this module
    #[serde(default)]
    pub resources: Vec<StateResource>,
    /// Nested modules
    #[serde(default)]
    pub child_modules: Vec<Module>,
}

impl Module {
    /// Resources of this module, optionally followed by those of every
    /// descendant, depth-first in declaration order
    #[must_use]
    pub fn resources(&self, include_child_modules: bool) -> Vec<&StateResource> {
        let mut out = Vec::new();
        self.collect(include_child_modules, &mut out);
        out
    }

    /// Module address, or `root` for the top-level module
    #[must_use]
    pub fn label(&self) -> &str {
        self.address.as_deref().unwrap_or("root")
    }

    fn collect<'a>(&'a self, recurse: bool, out: &mut Vec<&'a StateResource>) {
        trace!(
            module = self.label(),
            resources = self.resources.len(),
            "walking module"
        );
        out.extend(self.resources.iter());
        if recurse {
            for child in &self.child_modules {
                child.collect(true, out);
            }
        }
    }
}

/// One resource entry as it appears in state
#[derive(Debug, Clone, Deserialize)]
pub struct StateResource {
    /// Full address (`module.lab.proxmox_virtual_environment_vm.web`)
    #[serde(default)]
    pub address: String,
    /// `managed` or `data`
    #[serde(default)]
    pub mode: Option<String>,
    /// Resource type
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Name of the resource block
    pub name: String,
    /// Attribute values
    #[serde(default)]
    pub values: Value,
}

impl StateResource {
    fn is_data_source(&self) -> bool {
        self.mode.as_deref() == Some("data")
    }

    fn display_address(&self) -> String {
        if self.address.is_empty() {
            format!("{}.{}", self.type_tag, self.name)
        } else {
            self.address.clone()
        }
    }

    fn decode_values<T: DeserializeOwned>(&self) -> Result<T, InventoryError> {
        T::deserialize(&self.values).map_err(|e| InventoryError::MalformedResource {
            address: self.display_address(),
            reason: e.to_string(),
        })
    }

    /// Convert into a typed record if this is a managed compute resource
    ///
    /// # Errors
    /// Returns [`InventoryError::MalformedResource`] when a compute resource's
    /// attribute values do not have the expected shape.
    pub fn to_record(&self) -> Result<Option<ResourceRecord>, InventoryError> {
        let Some(kind) = ResourceKind::from_type_tag(&self.type_tag) else {
            trace!(address = %self.display_address(), "skipping non-compute resource");
            return Ok(None);
        };
        if self.is_data_source() {
            trace!(address = %self.display_address(), "skipping data source");
            return Ok(None);
        }

        let record = match kind {
            ResourceKind::VirtualMachine => {
                let values: VmValues = self.decode_values()?;
                ResourceRecord {
                    address: self.display_address(),
                    name: values.name.unwrap_or_else(|| self.name.clone()),
                    node_name: values.node_name,
                    tags: values.tags.unwrap_or_default(),
                    compute: Compute::VirtualMachine(VmNetwork {
                        devices: values
                            .network_device
                            .unwrap_or_default()
                            .into_iter()
                            .map(|d| NetworkDevice {
                                bridge: d.bridge.unwrap_or_default(),
                                mac_address: d.mac_address.unwrap_or_default(),
                            })
                            .collect(),
                        mac_addresses: values.mac_addresses.unwrap_or_default(),
                        ipv4_addresses: values.ipv4_addresses.unwrap_or_default(),
                    }),
                }
            }
            ResourceKind::Container => {
                let values: ContainerValues = self.decode_values()?;
                let initialization_hostname = values
                    .initialization
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .and_then(|init| init.hostname)
                    .filter(|hostname| !hostname.is_empty());
                ResourceRecord {
                    address: self.display_address(),
                    name: self.name.clone(),
                    node_name: values.node_name,
                    tags: values.tags.unwrap_or_default(),
                    compute: Compute::Container {
                        network: ContainerNetwork {
                            interfaces: values
                                .network_interface
                                .unwrap_or_default()
                                .into_iter()
                                .map(|i| ContainerInterface {
                                    name: i.name.unwrap_or_default(),
                                    bridge: i.bridge.unwrap_or_default(),
                                })
                                .collect(),
                            ipv4: values
                                .ipv4
                                .unwrap_or_default()
                                .into_iter()
                                .filter_map(|(iface, addr)| addr.map(|addr| (iface, addr)))
                                .collect(),
                        },
                        initialization_hostname,
                    },
                }
            }
        };

        Ok(Some(record))
    }
}

#[derive(Deserialize)]
struct VmValues {
    #[serde(default)]
    name: Option<String>,
    node_name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    network_device: Option<Vec<VmDeviceValues>>,
    #[serde(default)]
    mac_addresses: Option<Vec<String>>,
    #[serde(default)]
    ipv4_addresses: Option<Vec<Vec<String>>>,
}

#[derive(Deserialize)]
struct VmDeviceValues {
    #[serde(default)]
    bridge: Option<String>,
    #[serde(default)]
    mac_address: Option<String>,
}

#[derive(Deserialize)]
struct ContainerValues {
    node_name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    network_interface: Option<Vec<ContainerInterfaceValues>>,
    #[serde(default)]
    ipv4: Option<BTreeMap<String, Option<String>>>,
    #[serde(default)]
    initialization: Option<Vec<InitializationValues>>,
}

#[derive(Deserialize)]
struct ContainerInterfaceValues {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bridge: Option<String>,
}

#[derive(Deserialize)]
struct InitializationValues {
    #[serde(default)]
    hostname: Option<String>,
}

/// Normalize a `terraform show -json` document to its values subtree
///
/// Returns `Ok(None)` for a project without state: Terraform then prints a
/// document holding nothing but `format_version`.
///
/// # Errors
/// Returns [`InventoryError::MalformedState`] if the document is not a JSON
/// object or its values subtree does not have the module layout.
pub fn normalize(document: Value) -> Result<Option<StateValues>, InventoryError> {
    let Value::Object(mut map) = document else {
        return Err(InventoryError::MalformedState(
            "top-level value is not an object".to_string(),
        ));
    };

    if is_uninitialized(&map) {
        debug!("state document holds no resources");
        return Ok(None);
    }

    let values = match map.remove("planned_values") {
        Some(planned) => {
            debug!("reading planned values");
            planned
        }
        None => match map.remove("values") {
            Some(values) => values,
            None => {
                debug!("state document has no values");
                return Ok(None);
            }
        },
    };

    if values.is_null() {
        return Ok(None);
    }

    StateValues::deserialize(values)
        .map(Some)
        .map_err(|e| InventoryError::MalformedState(e.to_string()))
}

fn is_uninitialized(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.contains_key("format_version")
}

/// Extract compute resource records from a `terraform show -json` document
///
/// # Errors
/// Returns an error if the document or one of its compute resources is malformed.
pub fn extract(
    document: Value,
    include_child_modules: bool,
) -> Result<Option<Vec<ResourceRecord>>, InventoryError> {
    let Some(values) = normalize(document)? else {
        return Ok(None);
    };

    let resources = values.root_module.resources(include_child_modules);
    let mut records = Vec::new();
    for resource in resources {
        if let Some(record) = resource.to_record()? {
            records.push(record);
        }
    }

    debug!(count = records.len(), "extracted compute resources");

    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn vm(address: &str, name: &str) -> Value {
        json!({
            "address": address,
            "mode": "managed",
            "type": "proxmox_virtual_environment_vm",
            "name": name,
            "values": {
                "name": name,
                "node_name": "pve1",
                "tags": ["web"],
                "network_device": [{"bridge": "vmbr0", "mac_address": "BC:24:11:00:00:01"}],
                "mac_addresses": ["00:00:00:00:00:00", "BC:24:11:00:00:01"],
                "ipv4_addresses": [["127.0.0.1"], ["10.0.0.10"]]
            }
        })
    }

    fn lxc(address: &str, name: &str) -> Value {
        json!({
            "address": address,
            "mode": "managed",
            "type": "proxmox_virtual_environment_container",
            "name": name,
            "values": {
                "node_name": "pve2",
                "tags": null,
                "network_interface": [{"name": "eth0", "bridge": "vmbr0"}],
                "ipv4": {"eth0": "10.0.0.20", "lo": null},
                "initialization": [{"hostname": "dns1"}]
            }
        })
    }

    fn state(root: Value) -> Value {
        json!({
            "format_version": "1.0",
            "terraform_version": "1.9.5",
            "values": {"root_module": root}
        })
    }

    fn names(records: &[ResourceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_uninitialized_project() {
        let records = extract(json!({"format_version": "1.0"}), true).unwrap();
        assert!(records.is_none());
    }

    #[test]
    fn test_state_without_values() {
        let doc = json!({"format_version": "1.0", "terraform_version": "1.9.5"});
        assert!(extract(doc, true).unwrap().is_none());
    }

    #[test]
    fn test_not_an_object() {
        let err = extract(json!([1, 2, 3]), true).unwrap_err();
        assert!(matches!(err, InventoryError::MalformedState(_)));
    }

    #[test]
    fn test_child_modules_depth_first() {
        let doc = state(json!({
            "resources": [vm("proxmox_virtual_environment_vm.a", "a")],
            "child_modules": [
                {
                    "address": "module.one",
                    "resources": [vm("module.one.proxmox_virtual_environment_vm.b", "b")],
                    "child_modules": [{
                        "address": "module.one.module.deep",
                        "resources": [lxc("module.one.module.deep.proxmox_virtual_environment_container.c", "c")]
                    }]
                },
                {
                    "address": "module.two",
                    "resources": [vm("module.two.proxmox_virtual_environment_vm.d", "d")]
                }
            ]
        }));

        let all = extract(doc.clone(), true).unwrap().unwrap();
        assert_eq!(names(&all), vec!["a", "b", "c", "d"]);

        let root_only = extract(doc, false).unwrap().unwrap();
        assert_eq!(names(&root_only), vec!["a"]);
    }

    #[test]
    fn test_module_labels() {
        let values: StateValues = serde_json::from_value(json!({
            "root_module": {
                "child_modules": [{
                    "address": "module.edge",
                    "child_modules": [{"address": "module.edge.module.dns"}]
                }]
            }
        }))
        .unwrap();

        let root = &values.root_module;
        assert_eq!(root.label(), "root");
        assert_eq!(root.child_modules[0].label(), "module.edge");
        assert_eq!(
            root.child_modules[0].child_modules[0].label(),
            "module.edge.module.dns"
        );
    }

    #[test]
    fn test_non_compute_and_data_sources_dropped() {
        let doc = state(json!({
            "resources": [
                {"address": "proxmox_virtual_environment_file.iso", "mode": "managed",
                 "type": "proxmox_virtual_environment_file", "name": "iso", "values": {}},
                {"address": "data.proxmox_virtual_environment_vm.tpl", "mode": "data",
                 "type": "proxmox_virtual_environment_vm", "name": "tpl", "values": {"node_name": "pve1"}},
                lxc("proxmox_virtual_environment_container.dns", "dns")
            ]
        }));

        let records = extract(doc, true).unwrap().unwrap();
        assert_eq!(names(&records), vec!["dns"]);
    }

    #[test]
    fn test_plan_matches_state() {
        let root = json!({"resources": [
            vm("proxmox_virtual_environment_vm.web", "web"),
            lxc("proxmox_virtual_environment_container.dns", "dns")
        ]});
        let plan = json!({
            "format_version": "1.2",
            "terraform_version": "1.9.5",
            "planned_values": {"root_module": root.clone()},
            "resource_changes": [],
            "configuration": {}
        });

        let from_state = extract(state(root), true).unwrap();
        let from_plan = extract(plan, true).unwrap();
        assert_eq!(from_state, from_plan);
    }

    #[test]
    fn test_vm_record() {
        let doc = state(json!({"resources": [vm("proxmox_virtual_environment_vm.web", "web")]}));
        let records = extract(doc, true).unwrap().unwrap();

        let record = &records[0];
        assert_eq!(record.kind(), ResourceKind::VirtualMachine);
        assert_eq!(record.address, "proxmox_virtual_environment_vm.web");
        assert_eq!(record.node_name, "pve1");
        assert_eq!(record.tags, vec!["web".to_string()]);
        let Compute::VirtualMachine(net) = &record.compute else {
            panic!("expected a virtual machine");
        };
        assert_eq!(net.devices[0].bridge, "vmbr0");
        assert_eq!(net.mac_addresses.len(), 2);
        assert_eq!(net.ipv4_addresses[1], vec!["10.0.0.10".to_string()]);
    }

    #[test]
    fn test_vm_name_falls_back_to_block_name() {
        let mut resource = vm("proxmox_virtual_environment_vm.unnamed", "unnamed");
        resource["values"]["name"] = Value::Null;
        let doc = state(json!({"resources": [resource]}));

        let records = extract(doc, true).unwrap().unwrap();
        assert_eq!(records[0].name, "unnamed");
    }

    #[test]
    fn test_container_record() {
        let doc = state(json!({"resources": [lxc("proxmox_virtual_environment_container.dns", "dns")]}));
        let records = extract(doc, true).unwrap().unwrap();

        let record = &records[0];
        assert_eq!(record.kind(), ResourceKind::Container);
        assert!(record.tags.is_empty());
        let Compute::Container {
            network,
            initialization_hostname,
        } = &record.compute
        else {
            panic!("expected a container");
        };
        assert_eq!(initialization_hostname.as_deref(), Some("dns1"));
        assert_eq!(network.interfaces[0].name, "eth0");
        assert_eq!(network.ipv4.get("eth0").map(String::as_str), Some("10.0.0.20"));
        assert!(!network.ipv4.contains_key("lo"));
    }

    #[test]
    fn test_malformed_compute_resource() {
        let doc = state(json!({"resources": [{
            "address": "proxmox_virtual_environment_vm.broken",
            "mode": "managed",
            "type": "proxmox_virtual_environment_vm",
            "name": "broken",
            "values": {"node_name": 7}
        }]}));

        let err = extract(doc, true).unwrap_err();
        assert!(
            matches!(err, InventoryError::MalformedResource { ref address, .. } if address == "proxmox_virtual_environment_vm.broken")
        );
    }
}
