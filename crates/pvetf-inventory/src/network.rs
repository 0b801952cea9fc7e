//! Network identity resolution
//!
//! Picks the address Ansible should connect to. The interface attached to the
//! configured bridge is authoritative; how its address is found depends on the
//! resource kind.

use tracing::debug;

use crate::error::InventoryError;
use crate::types::{Compute, ContainerNetwork, ResourceRecord, VmNetwork};

/// Resolve the reachable IPv4 address of a resource
///
/// Containers in DNS-only mode have no address. Virtual machines are always
/// resolved since `dns_only` only applies to containers.
///
/// # Errors
/// Returns [`InventoryError::NoMatchingDevice`] if nothing is attached to
/// `bridge_iface`, or [`InventoryError::AddressNotFound`] if the attached device
/// has no reported address.
pub fn resolve_address(
    record: &ResourceRecord,
    bridge_iface: &str,
    dns_only: bool,
) -> Result<Option<String>, InventoryError> {
    let address = match &record.compute {
        Compute::VirtualMachine(network) => Some(vm_address(record, network, bridge_iface)?),
        Compute::Container { .. } if dns_only => None,
        Compute::Container { network, .. } => {
            Some(container_address(record, network, bridge_iface)?)
        }
    };

    debug!(resource = %record.name, address = ?address, "resolved address");

    Ok(address)
}

fn vm_address(
    record: &ResourceRecord,
    network: &VmNetwork,
    bridge_iface: &str,
) -> Result<String, InventoryError> {
    let device = network
        .devices
        .iter()
        .find(|d| d.bridge == bridge_iface)
        .ok_or_else(|| InventoryError::NoMatchingDevice {
            resource: record.name.clone(),
            bridge: bridge_iface.to_string(),
        })?;

    let not_found = || InventoryError::AddressNotFound {
        resource: record.name.clone(),
        device: device.mac_address.clone(),
    };

    // The guest agent may list the same MAC more than once; the first entry wins.
    let idx = network
        .mac_addresses
        .iter()
        .position(|mac| mac.eq_ignore_ascii_case(&device.mac_address))
        .ok_or_else(not_found)?;

    // Each entry holds a single address in practice, only the first is used.
    network
        .ipv4_addresses
        .get(idx)
        .and_then(|addrs| addrs.first())
        .cloned()
        .ok_or_else(not_found)
}

fn container_address(
    record: &ResourceRecord,
    network: &ContainerNetwork,
    bridge_iface: &str,
) -> Result<String, InventoryError> {
    let iface = network
        .interfaces
        .iter()
        .find(|i| i.bridge == bridge_iface)
        .ok_or_else(|| InventoryError::NoMatchingDevice {
            resource: record.name.clone(),
            bridge: bridge_iface.to_string(),
        })?;

    network
        .ipv4
        .get(&iface.name)
        .cloned()
        .ok_or_else(|| InventoryError::AddressNotFound {
            resource: record.name.clone(),
            device: iface.name.clone(),
        })
}

/// Resolve the inventory hostname of a resource
///
/// Containers prefer their initialization hostname over the declared name.
/// A non-empty `domain` is appended after a dot.
#[must_use]
pub fn resolve_hostname(record: &ResourceRecord, domain: &str) -> String {
    let base = match &record.compute {
        Compute::Container {
            initialization_hostname: Some(hostname),
            ..
        } => hostname.as_str(),
        _ => record.name.as_str(),
    };

    if domain.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{domain}")
    }
}
