//! Inventory type definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Variables;

// ============================================================================
// Resource kinds
// ============================================================================

/// Compute resource kinds understood by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// QEMU virtual machine
    VirtualMachine,
    /// LXC container
    Container,
}

impl ResourceKind {
    /// Every known kind, in allow-list order
    pub const ALL: [ResourceKind; 2] = [ResourceKind::VirtualMachine, ResourceKind::Container];

    /// Terraform resource type of the bpg/proxmox provider
    #[must_use]
    pub fn type_tag(self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "proxmox_virtual_environment_vm",
            ResourceKind::Container => "proxmox_virtual_environment_container",
        }
    }

    /// Look up a kind by Terraform resource type
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_tag() == tag)
    }

    /// Group every host of this kind belongs to
    #[must_use]
    pub fn group_name(self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "proxmox_qemu",
            ResourceKind::Container => "proxmox_lxc",
        }
    }

    /// Value of the `type` host variable
    #[must_use]
    pub fn type_var(self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "qemu",
            ResourceKind::Container => "lxc",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_var())
    }
}

// ============================================================================
// Network shapes
// ============================================================================

/// VM network device as declared in `network_device`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDevice {
    /// Bridge the device is attached to
    pub bridge: String,
    /// MAC address
    pub mac_address: String,
}

/// Network data reported for a virtual machine
///
/// `mac_addresses` and `ipv4_addresses` are parallel lists filled in by the
/// guest agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmNetwork {
    /// Declared devices, in order
    pub devices: Vec<NetworkDevice>,
    /// MAC address per guest interface
    pub mac_addresses: Vec<String>,
    /// IPv4 addresses per guest interface
    pub ipv4_addresses: Vec<Vec<String>>,
}

/// Container network interface as declared in `network_interface`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInterface {
    /// Interface name inside the container (`eth0`)
    pub name: String,
    /// Bridge the interface is attached to
    pub bridge: String,
}

/// Network data reported for a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerNetwork {
    /// Declared interfaces, in order
    pub interfaces: Vec<ContainerInterface>,
    /// IPv4 address by interface name
    pub ipv4: BTreeMap<String, String>,
}

/// Kind-specific part of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Compute {
    /// QEMU virtual machine
    VirtualMachine(VmNetwork),
    /// LXC container
    Container {
        /// Network data
        network: ContainerNetwork,
        /// First `initialization.hostname`, when set
        initialization_hostname: Option<String>,
    },
}

// ============================================================================
// Records
// ============================================================================

/// One compute resource found in Terraform state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Terraform address (`module.lab.proxmox_virtual_environment_vm.web`)
    pub address: String,
    /// Declared name
    pub name: String,
    /// PVE node the resource runs on
    pub node_name: String,
    /// Tags, in declaration order
    pub tags: Vec<String>,
    /// Kind-specific data
    pub compute: Compute,
}

impl ResourceRecord {
    /// Kind of this resource
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self.compute {
            Compute::VirtualMachine(_) => ResourceKind::VirtualMachine,
            Compute::Container { .. } => ResourceKind::Container,
        }
    }
}

/// A host ready to be registered with the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHost {
    /// Inventory hostname
    pub hostname: String,
    /// Reachable IPv4 address, absent in DNS-only mode
    pub address: Option<String>,
    /// Kind of the backing resource
    pub kind: ResourceKind,
    /// Group memberships after exclusions, first-seen order
    pub groups: Vec<String>,
    /// Host variables, overrides applied
    pub variables: Variables,
}
