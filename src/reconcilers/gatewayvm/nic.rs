// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway IP configuration on pool NICs.
//!
//! Each gateway node's primary NIC carries its primary IP configuration plus at
//! most one gateway IP configuration named `<namespace>_<name>` after the
//! `GatewayVMConfiguration`. The primary IP configuration is a member of the
//! pool's load balancer backend pool exactly when the gateway configuration is
//! present.
//!
//! Scale set models, scale set instances and standalone NICs use different
//! ARM shapes for the same data; [`IpConfiguration`] hides the difference so
//! [`converge_ip_configurations`] runs once for all three.

use crate::azure::types::{
    ids_equal, optional_ids_equal, InterfaceIpConfiguration, InterfaceIpConfigurationProperties,
    IpVersion, NetworkInterface, PublicIpAddress, PublicIpAddressConfigurationProperties,
    SubResource, VirtualMachineScaleSet, VirtualMachineScaleSetIpConfiguration,
    VirtualMachineScaleSetIpConfigurationProperties, VirtualMachineScaleSetNetworkConfiguration,
    VirtualMachineScaleSetPublicIpAddressConfiguration, VirtualMachineScaleSetVm,
};
use crate::constants::PROVISIONING_STATE_FAILED;
use crate::gateway_errors::GatewayError;
use tracing::debug;

/// What a NIC should look like after convergence.
#[derive(Clone, Copy, Debug)]
pub struct NicTarget<'a> {
    /// Name of the gateway IP configuration
    pub ip_config_name: &'a str,
    /// Whether the gateway IP configuration should exist
    pub want_ip_config: bool,
    /// Public IP prefix the gateway IP configuration allocates from
    pub public_ip_prefix_id: Option<&'a str>,
    /// Backend pool of the agent pool on the shared load balancer
    pub backend_pool_id: &'a str,
}

/// Gateway IP configuration name of a `GatewayVMConfiguration`.
#[must_use]
pub fn gateway_ip_config_name(namespace: &str, name: &str) -> String {
    format!("{namespace}_{name}")
}

/// Uniform view over the IP configuration shapes.
pub trait IpConfiguration: Sized {
    fn name(&self) -> &str;
    fn is_primary(&self) -> bool;
    fn ip_version(&self) -> IpVersion;
    fn subnet_id(&self) -> Option<&str>;
    fn has_public_ip(&self) -> bool;
    fn public_ip_prefix_id(&self) -> Option<&str>;
    fn backend_pools(&self) -> &[SubResource];
    fn backend_pools_mut(&mut self) -> &mut Vec<SubResource>;

    /// A non-primary IPv4 configuration on `subnet_id`, allocating from the
    /// prefix when one is given.
    fn gateway(name: &str, subnet_id: Option<&str>, public_ip_prefix_id: Option<&str>) -> Self;
}

impl IpConfiguration for VirtualMachineScaleSetIpConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_primary(&self) -> bool {
        self.properties.primary.unwrap_or(false)
    }

    fn ip_version(&self) -> IpVersion {
        self.properties
            .private_ip_address_version
            .unwrap_or(IpVersion::IPv4)
    }

    fn subnet_id(&self) -> Option<&str> {
        self.properties.subnet.as_ref().map(|s| s.id.as_str())
    }

    fn has_public_ip(&self) -> bool {
        self.properties.public_ip_address_configuration.is_some()
    }

    fn public_ip_prefix_id(&self) -> Option<&str> {
        self.properties
            .public_ip_address_configuration
            .as_ref()
            .and_then(|p| p.properties.public_ip_prefix.as_ref())
            .map(|p| p.id.as_str())
    }

    fn backend_pools(&self) -> &[SubResource] {
        &self.properties.load_balancer_backend_address_pools
    }

    fn backend_pools_mut(&mut self) -> &mut Vec<SubResource> {
        &mut self.properties.load_balancer_backend_address_pools
    }

    fn gateway(name: &str, subnet_id: Option<&str>, public_ip_prefix_id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            properties: VirtualMachineScaleSetIpConfigurationProperties {
                primary: Some(false),
                private_ip_address_version: Some(IpVersion::IPv4),
                subnet: subnet_id.map(SubResource::new),
                public_ip_address_configuration: public_ip_prefix_id.map(|prefix| {
                    VirtualMachineScaleSetPublicIpAddressConfiguration {
                        name: name.to_string(),
                        properties: PublicIpAddressConfigurationProperties {
                            public_ip_prefix: Some(SubResource::new(prefix)),
                        },
                    }
                }),
                ..Default::default()
            },
        }
    }
}

impl IpConfiguration for InterfaceIpConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_primary(&self) -> bool {
        self.properties.primary.unwrap_or(false)
    }

    fn ip_version(&self) -> IpVersion {
        self.properties
            .private_ip_address_version
            .unwrap_or(IpVersion::IPv4)
    }

    fn subnet_id(&self) -> Option<&str> {
        self.properties.subnet.as_ref().map(|s| s.id.as_str())
    }

    fn has_public_ip(&self) -> bool {
        self.properties.public_ip_address.is_some()
    }

    fn public_ip_prefix_id(&self) -> Option<&str> {
        self.properties
            .public_ip_address
            .as_ref()
            .and_then(|p| p.properties.public_ip_prefix.as_ref())
            .map(|p| p.id.as_str())
    }

    fn backend_pools(&self) -> &[SubResource] {
        &self.properties.load_balancer_backend_address_pools
    }

    fn backend_pools_mut(&mut self) -> &mut Vec<SubResource> {
        &mut self.properties.load_balancer_backend_address_pools
    }

    fn gateway(name: &str, subnet_id: Option<&str>, public_ip_prefix_id: Option<&str>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            properties: InterfaceIpConfigurationProperties {
                primary: Some(false),
                private_ip_address_version: Some(IpVersion::IPv4),
                subnet: subnet_id.map(SubResource::new),
                public_ip_address: public_ip_prefix_id.map(|prefix| PublicIpAddress {
                    id: None,
                    name: Some(name.to_string()),
                    properties: PublicIpAddressConfigurationProperties {
                        public_ip_prefix: Some(SubResource::new(prefix)),
                    },
                }),
                ..Default::default()
            },
        }
    }
}

/// Whether two IP configurations differ in primary flag, IP version, subnet
/// or public IP prefix. IDs compare case-insensitively.
pub fn ip_config_differs<C: IpConfiguration>(a: &C, b: &C) -> bool {
    a.is_primary() != b.is_primary()
        || a.ip_version() != b.ip_version()
        || !optional_ids_equal(a.subnet_id(), b.subnet_id())
        || a.has_public_ip() != b.has_public_ip()
        || !optional_ids_equal(a.public_ip_prefix_id(), b.public_ip_prefix_id())
}

/// Position of the primary IP configuration.
///
/// Without a flagged one, the only configuration other than the gateway
/// configuration counts as primary.
pub fn primary_ip_config_index<C: IpConfiguration>(configs: &[C], gateway_name: &str) -> Option<usize> {
    configs.iter().position(|c| c.is_primary()).or_else(|| {
        let mut others = configs
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.name().eq_ignore_ascii_case(gateway_name));
        match (others.next(), others.next()) {
            (Some((index, _)), None) => Some(index),
            _ => None,
        }
    })
}

/// Converge the IP configurations of one NIC. Returns whether anything changed.
///
/// # Errors
///
/// Returns [`GatewayError::MissingPrimaryIpConfig`] when no primary
/// configuration can be identified.
pub fn converge_ip_configurations<C: IpConfiguration>(
    ip_configs: &mut Vec<C>,
    target: &NicTarget<'_>,
    resource: &str,
) -> Result<bool, GatewayError> {
    let primary_index = primary_ip_config_index(ip_configs, target.ip_config_name).ok_or_else(|| {
        GatewayError::MissingPrimaryIpConfig {
            resource: resource.to_string(),
        }
    })?;
    let primary_name = ip_configs[primary_index].name().to_string();
    let primary_subnet = ip_configs[primary_index].subnet_id().map(str::to_string);

    let expected = C::gateway(
        target.ip_config_name,
        primary_subnet.as_deref(),
        target.public_ip_prefix_id,
    );
    let mut changed = false;

    let existing = ip_configs
        .iter()
        .position(|c| c.name().eq_ignore_ascii_case(target.ip_config_name));
    let mut present = existing.is_some();
    if let Some(index) = existing {
        if !target.want_ip_config || ip_config_differs(&ip_configs[index], &expected) {
            debug!(resource = resource, ip_config = target.ip_config_name, "Removing gateway IP configuration");
            ip_configs.remove(index);
            present = false;
            changed = true;
        }
    }
    if target.want_ip_config && !present {
        debug!(resource = resource, ip_config = target.ip_config_name, "Adding gateway IP configuration");
        ip_configs.push(expected);
        changed = true;
    }

    let need_membership = ip_configs.len() > 1;
    if let Some(primary) = ip_configs
        .iter_mut()
        .find(|c| c.name().eq_ignore_ascii_case(&primary_name))
    {
        let is_member = primary
            .backend_pools()
            .iter()
            .any(|p| ids_equal(&p.id, target.backend_pool_id));
        if need_membership && !is_member {
            primary
                .backend_pools_mut()
                .push(SubResource::new(target.backend_pool_id));
            changed = true;
        } else if !need_membership && is_member {
            primary
                .backend_pools_mut()
                .retain(|p| !ids_equal(&p.id, target.backend_pool_id));
            changed = true;
        }
    }

    Ok(changed)
}

/// Position of the primary NIC configuration; a single unflagged one counts as primary.
fn primary_network_configuration_index(configs: &[VirtualMachineScaleSetNetworkConfiguration]) -> Option<usize> {
    configs
        .iter()
        .position(|c| c.properties.primary.unwrap_or(false))
        .or_else(|| (configs.len() == 1).then_some(0))
}

fn primary_network_configuration<'a>(
    configs: &'a mut [VirtualMachineScaleSetNetworkConfiguration],
    resource: &str,
) -> Result<&'a mut VirtualMachineScaleSetNetworkConfiguration, GatewayError> {
    let index = primary_network_configuration_index(configs).ok_or_else(|| GatewayError::MissingPrimaryNic {
        resource: resource.to_string(),
    })?;
    Ok(&mut configs[index])
}

/// Converge the NIC template of a scale set model.
///
/// # Errors
///
/// Fails on a missing network profile, primary NIC or primary IP configuration.
pub fn converge_vmss_model(
    vmss: &mut VirtualMachineScaleSet,
    target: &NicTarget<'_>,
    resource: &str,
) -> Result<bool, GatewayError> {
    let profile = vmss
        .properties
        .virtual_machine_profile
        .as_mut()
        .and_then(|p| p.network_profile.as_mut())
        .ok_or_else(|| GatewayError::MissingNetworkProfile {
            resource: resource.to_string(),
        })?;
    let nic = primary_network_configuration(&mut profile.network_interface_configurations, resource)?;
    converge_ip_configurations(&mut nic.properties.ip_configurations, target, resource)
}

/// Converge the NIC model of one scale set instance.
///
/// Instances in a failed provisioning state always need an update.
///
/// # Errors
///
/// Fails on a missing network profile, primary NIC or primary IP configuration.
pub fn converge_vmss_instance(
    vm: &mut VirtualMachineScaleSetVm,
    target: &NicTarget<'_>,
    resource: &str,
) -> Result<bool, GatewayError> {
    let failed = is_failed(vm.properties.provisioning_state.as_deref());
    let profile = vm
        .properties
        .network_profile_configuration
        .as_mut()
        .ok_or_else(|| GatewayError::MissingNetworkProfile {
            resource: resource.to_string(),
        })?;
    let nic = primary_network_configuration(&mut profile.network_interface_configurations, resource)?;
    let changed = converge_ip_configurations(&mut nic.properties.ip_configurations, target, resource)?;
    Ok(changed || failed)
}

/// Name of the primary NIC of a scale set instance.
///
/// # Errors
///
/// Fails on a missing network profile or primary NIC.
pub fn primary_instance_nic_name(vm: &VirtualMachineScaleSetVm, resource: &str) -> Result<String, GatewayError> {
    let configs = &vm
        .properties
        .network_profile_configuration
        .as_ref()
        .ok_or_else(|| GatewayError::MissingNetworkProfile {
            resource: resource.to_string(),
        })?
        .network_interface_configurations;
    primary_network_configuration_index(configs)
        .map(|index| configs[index].name.clone())
        .ok_or_else(|| GatewayError::MissingPrimaryNic {
            resource: resource.to_string(),
        })
}

/// Converge a standalone NIC resource.
///
/// # Errors
///
/// Fails when no primary IP configuration can be identified.
pub fn converge_nic(
    nic: &mut NetworkInterface,
    target: &NicTarget<'_>,
    resource: &str,
) -> Result<bool, GatewayError> {
    let failed = is_failed(nic.properties.provisioning_state.as_deref());
    let changed = converge_ip_configurations(&mut nic.properties.ip_configurations, target, resource)?;
    Ok(changed || failed)
}

pub(crate) fn is_failed(provisioning_state: Option<&str>) -> bool {
    provisioning_state.is_some_and(|s| s.eq_ignore_ascii_case(PROVISIONING_STATE_FAILED))
}

/// Private addresses of one gateway node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NicAddresses {
    pub primary_ip: String,
    pub secondary_ip: Option<String>,
}

/// Read the primary and gateway private IPs from a live NIC.
///
/// # Errors
///
/// Fails when the primary or gateway configuration lacks a private IP, or the
/// gateway configuration lacks the public IP it was given.
pub fn read_nic_addresses(
    nic: &NetworkInterface,
    target: &NicTarget<'_>,
    resource: &str,
) -> Result<NicAddresses, GatewayError> {
    let configs = &nic.properties.ip_configurations;
    let primary = primary_ip_config_index(configs, target.ip_config_name)
        .map(|index| &configs[index])
        .ok_or_else(|| GatewayError::MissingPrimaryIpConfig {
            resource: resource.to_string(),
        })?;
    let primary_ip = primary
        .properties
        .private_ip_address
        .clone()
        .ok_or_else(|| GatewayError::MissingPrivateIp {
            resource: resource.to_string(),
            ip_config: primary.name.clone(),
        })?;

    if !target.want_ip_config {
        return Ok(NicAddresses {
            primary_ip,
            secondary_ip: None,
        });
    }

    let missing_private = || GatewayError::MissingPrivateIp {
        resource: resource.to_string(),
        ip_config: target.ip_config_name.to_string(),
    };
    let gateway = configs
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(target.ip_config_name))
        .ok_or_else(missing_private)?;
    if target.public_ip_prefix_id.is_some() && !gateway.has_public_ip() {
        return Err(GatewayError::MissingPublicIp {
            resource: resource.to_string(),
            ip_config: target.ip_config_name.to_string(),
        });
    }
    let secondary_ip = gateway
        .properties
        .private_ip_address
        .clone()
        .ok_or_else(missing_private)?;

    Ok(NicAddresses {
        primary_ip,
        secondary_ip: Some(secondary_ip),
    })
}

#[cfg(test)]
#[path = "nic_tests.rs"]
mod nic_tests;
