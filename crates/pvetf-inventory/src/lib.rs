//! pvetf-inventory: Terraform state to Ansible inventory
//!
//! Reads `terraform show -json` output for projects using the bpg/proxmox
//! provider, resolves each virtual machine and container to a reachable host,
//! and registers hosts, groups and variables with an [`InventorySink`].

pub mod builder;
pub mod collector;
pub mod config;
pub mod error;
pub mod network;
pub mod sink;
pub mod state;
pub mod terraform;
pub mod types;

pub use builder::{BuildSummary, InventoryBuilder, resolve_host};
pub use collector::InventoryCollector;
pub use config::{OneOrMany, RawConfig, ResolutionConfig, Scalar, Variables};
pub use error::InventoryError;
pub use network::{resolve_address, resolve_hostname};
pub use sink::{Inventory, InventorySink};
pub use state::extract;
pub use terraform::TerraformClient;
pub use types::{
    Compute, ContainerInterface, ContainerNetwork, NetworkDevice, ResolvedHost, ResourceKind,
    ResourceRecord, VmNetwork,
};
