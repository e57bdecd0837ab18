// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway node pools.
//!
//! A pool is either a scale set or a set of standalone VMs sharing a pool tag.
//! [`AgentPool`] resolves the pool from a [`GatewayPoolProfile`], exposes its
//! stable identity, and drives NIC convergence over every member.

use super::nic::{
    converge_nic, converge_vmss_instance, converge_vmss_model, is_failed, primary_instance_nic_name,
    read_nic_addresses, NicTarget,
};
use crate::azure::resource_id::load_balancer_id;
use crate::azure::types::{NetworkInterfaceReference, VirtualMachine, VirtualMachineScaleSet};
use crate::azure::{CloudClient, ResourceId};
use crate::config::CloudConfig;
use crate::constants::{DEFAULT_PUBLIC_IP_PREFIX_LENGTH, GATEWAY_PREFIX_SIZE_TAG, POOL_NAME_TAG};
use crate::crd::{GatewayPoolProfile, GatewayVmProfileStatus};
use crate::gateway_errors::{referenced_not_found, GatewayError};
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Length of the hex identity of a VM pool.
const VM_POOL_ID_LENGTH: usize = 32;

/// A resolved gateway node pool.
#[derive(Clone, Debug)]
pub enum AgentPool {
    /// Scale set backed pool.
    ScaleSet {
        resource_group: String,
        vmss: VirtualMachineScaleSet,
        prefix_length: i32,
    },
    /// Standalone VMs tagged with the pool name.
    Vms {
        resource_group: String,
        pool_name: String,
        vms: Vec<VirtualMachine>,
        prefix_length: i32,
    },
}

/// Count the populated pool selectors; exactly one is valid.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPoolSelector`] otherwise.
pub fn validate_pool_selector(pool: &GatewayPoolProfile) -> Result<(), GatewayError> {
    let count = [
        pool.gateway_nodepool_name.is_some(),
        pool.gateway_vmss_profile.is_some(),
        pool.gateway_vm_profile.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if count == 1 {
        Ok(())
    } else {
        Err(GatewayError::InvalidPoolSelector { count })
    }
}

fn tag_matches(tags: &BTreeMap<String, String>, pool_name: &str) -> bool {
    tags.iter()
        .any(|(k, v)| k.eq_ignore_ascii_case(POOL_NAME_TAG) && v.eq_ignore_ascii_case(pool_name))
}

fn prefix_size_from_tags(vmss: &VirtualMachineScaleSet) -> Result<i32, GatewayError> {
    let Some((_, raw)) = vmss
        .tags
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(GATEWAY_PREFIX_SIZE_TAG))
    else {
        return Ok(DEFAULT_PUBLIC_IP_PREFIX_LENGTH);
    };
    raw.trim().parse().map_err(|_| GatewayError::InvalidConfig {
        reason: format!(
            "tag {GATEWAY_PREFIX_SIZE_TAG}={raw} on scale set {} is not an integer",
            vmss.name.as_deref().unwrap_or_default()
        ),
    })
}

/// Identity of a VM pool: SHA-256 of the lower-cased `<resourceGroup>/<poolName>`, hex, truncated.
#[must_use]
pub fn vm_pool_unique_id(resource_group: &str, pool_name: &str) -> String {
    let digest = Sha256::digest(format!("{resource_group}/{pool_name}").to_lowercase().as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..VM_POOL_ID_LENGTH].to_string()
}

impl AgentPool {
    /// Resolve the pool a selector points at.
    ///
    /// # Errors
    ///
    /// Fails on an invalid selector, a pool that cannot be found, or a failed cloud call.
    pub async fn resolve(
        cloud: &dyn CloudClient,
        config: &CloudConfig,
        pool: &GatewayPoolProfile,
    ) -> Result<Self> {
        validate_pool_selector(pool)?;

        if let Some(pool_name) = &pool.gateway_nodepool_name {
            let vmss = cloud
                .list_vmss(&config.node_resource_group)
                .await?
                .into_iter()
                .find(|vmss| tag_matches(&vmss.tags, pool_name))
                .ok_or_else(|| GatewayError::PoolNotFound {
                    pool: pool_name.clone(),
                    resource_group: config.node_resource_group.clone(),
                })?;
            let prefix_length = prefix_size_from_tags(&vmss)?;
            debug!(pool = %pool_name, vmss = ?vmss.name, "Resolved node pool scale set");
            return Ok(Self::ScaleSet {
                resource_group: config.node_resource_group.clone(),
                vmss,
                prefix_length,
            });
        }

        if let Some(profile) = &pool.gateway_vmss_profile {
            let vmss = cloud
                .get_vmss(&profile.vmss_resource_group, &profile.vmss_name)
                .await
                .map_err(|e| referenced_not_found(e, "virtualMachineScaleSet", &profile.vmss_name))?;
            return Ok(Self::ScaleSet {
                resource_group: profile.vmss_resource_group.clone(),
                vmss,
                prefix_length: profile.public_ip_prefix_size,
            });
        }

        if let Some(profile) = &pool.gateway_vm_profile {
            let vms: Vec<VirtualMachine> = cloud
                .list_vms(&profile.resource_group)
                .await?
                .into_iter()
                .filter(|vm| tag_matches(&vm.tags, &profile.pool_name))
                .collect();
            if vms.is_empty() {
                return Err(GatewayError::PoolNotFound {
                    pool: profile.pool_name.clone(),
                    resource_group: profile.resource_group.clone(),
                }
                .into());
            }
            return Ok(Self::Vms {
                resource_group: profile.resource_group.clone(),
                pool_name: profile.pool_name.clone(),
                vms,
                prefix_length: profile.public_ip_prefix_size,
            });
        }

        Err(GatewayError::InvalidPoolSelector { count: 0 }.into())
    }

    /// Human-readable pool description for logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ScaleSet {
                resource_group,
                vmss,
                ..
            } => format!(
                "scale set {resource_group}/{}",
                vmss.name.as_deref().unwrap_or_default()
            ),
            Self::Vms {
                resource_group,
                pool_name,
                ..
            } => format!("vm pool {resource_group}/{pool_name}"),
        }
    }

    /// Stable pool identity, shared by every gateway on this pool.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MissingUniqueId`] when a scale set reports none.
    pub fn unique_id(&self) -> Result<String, GatewayError> {
        match self {
            Self::ScaleSet { vmss, .. } => vmss
                .properties
                .unique_id
                .clone()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| GatewayError::MissingUniqueId {
                    pool: self.describe(),
                }),
            Self::Vms {
                resource_group,
                pool_name,
                ..
            } => Ok(vm_pool_unique_id(resource_group, pool_name)),
        }
    }

    /// Public IP prefix length configured for the pool.
    #[must_use]
    pub fn prefix_length(&self) -> i32 {
        match self {
            Self::ScaleSet { prefix_length, .. } | Self::Vms { prefix_length, .. } => *prefix_length,
        }
    }

    /// ID of the pool's backend pool on the shared load balancer.
    ///
    /// # Errors
    ///
    /// Fails like [`AgentPool::unique_id`].
    pub fn backend_pool_id(&self, config: &CloudConfig) -> Result<String, GatewayError> {
        Ok(load_balancer_id(
            &config.subscription_id,
            &config.resource_group,
            &config.load_balancer_name,
        )
        .child("backendAddressPools", &self.unique_id()?))
    }

    /// Converge the gateway IP configuration on every pool member.
    ///
    /// Members are processed one at a time. When the configuration is wanted,
    /// the live NIC of each member is read back and one profile per node is
    /// returned, sorted by node name.
    ///
    /// # Errors
    ///
    /// Fails on malformed members and failed cloud calls.
    pub async fn reconcile(
        &self,
        cloud: &dyn CloudClient,
        target: &NicTarget<'_>,
    ) -> Result<Vec<GatewayVmProfileStatus>> {
        let mut profiles = match self {
            Self::ScaleSet {
                resource_group,
                vmss,
                ..
            } => reconcile_scale_set(cloud, resource_group, vmss, target).await?,
            Self::Vms {
                resource_group,
                vms,
                ..
            } => {
                let mut profiles = Vec::new();
                for vm in vms {
                    if let Some(profile) = reconcile_vm(cloud, resource_group, vm, target).await? {
                        profiles.push(profile);
                    }
                }
                profiles
            }
        };
        profiles.sort_by(|a, b| a.node_name.cmp(&b.node_name));
        Ok(profiles)
    }
}

async fn reconcile_scale_set(
    cloud: &dyn CloudClient,
    resource_group: &str,
    vmss: &VirtualMachineScaleSet,
    target: &NicTarget<'_>,
) -> Result<Vec<GatewayVmProfileStatus>> {
    let vmss_name = vmss.name.clone().unwrap_or_default();

    let mut model = vmss.clone();
    if converge_vmss_model(&mut model, target, &vmss_name)? {
        info!(vmss = %vmss_name, ip_config = target.ip_config_name, want = target.want_ip_config, "Updating scale set model");
        cloud
            .create_or_update_vmss(resource_group, &vmss_name, &model)
            .await?;
    }

    let mut profiles = Vec::new();
    for mut vm in cloud.list_vmss_vms(resource_group, &vmss_name).await? {
        let instance_id = vm.instance_id.clone().unwrap_or_default();
        let resource = format!("{vmss_name} instance {instance_id}");

        if converge_vmss_instance(&mut vm, target, &resource)? {
            info!(vmss = %vmss_name, instance = %instance_id, "Updating scale set instance");
            vm = cloud
                .update_vmss_vm(resource_group, &vmss_name, &instance_id, &vm)
                .await?;
        }
        if !target.want_ip_config {
            continue;
        }

        let nic_name = primary_instance_nic_name(&vm, &resource)?;
        let nic = cloud
            .get_vmss_vm_nic(resource_group, &vmss_name, &instance_id, &nic_name)
            .await?;
        let addresses = read_nic_addresses(&nic, target, &resource)?;
        let node_name = vm
            .properties
            .os_profile
            .as_ref()
            .and_then(|os| os.computer_name.clone())
            .or_else(|| vm.name.clone())
            .unwrap_or(instance_id);
        profiles.push(GatewayVmProfileStatus {
            node_name,
            primary_ip: Some(addresses.primary_ip),
            secondary_ip: addresses.secondary_ip,
        });
    }
    Ok(profiles)
}

/// Primary NIC reference of a VM; a single unflagged NIC counts as primary.
fn primary_nic_reference<'a>(vm: &'a VirtualMachine, resource: &str) -> Result<&'a NetworkInterfaceReference, GatewayError> {
    let nics = &vm
        .properties
        .network_profile
        .as_ref()
        .ok_or_else(|| GatewayError::MissingNetworkProfile {
            resource: resource.to_string(),
        })?
        .network_interfaces;
    nics.iter()
        .find(|n| n.properties.primary.unwrap_or(false))
        .or_else(|| if nics.len() == 1 { nics.first() } else { None })
        .ok_or_else(|| GatewayError::MissingPrimaryNic {
            resource: resource.to_string(),
        })
}

async fn reconcile_vm(
    cloud: &dyn CloudClient,
    resource_group: &str,
    vm: &VirtualMachine,
    target: &NicTarget<'_>,
) -> Result<Option<GatewayVmProfileStatus>> {
    let vm_name = vm.name.clone().unwrap_or_default();
    let resource = format!("virtual machine {vm_name}");

    let nic_ref = primary_nic_reference(vm, &resource)?;
    let nic_id = ResourceId::parse(&nic_ref.id)?;
    let mut nic = cloud
        .get_nic(&nic_id.resource_group, &nic_id.name)
        .await
        .map_err(|e| referenced_not_found(e, "networkInterface", &nic_ref.id))?;

    if converge_nic(&mut nic, target, &resource)? {
        info!(vm = %vm_name, nic = %nic_id.name, "Updating network interface");
        cloud
            .create_or_update_nic(&nic_id.resource_group, &nic_id.name, &nic)
            .await?;
        nic = cloud.get_nic(&nic_id.resource_group, &nic_id.name).await?;
    }

    if is_failed(vm.properties.provisioning_state.as_deref()) {
        info!(vm = %vm_name, "Retrying failed virtual machine provisioning");
        cloud.create_or_update_vm(resource_group, &vm_name, vm).await?;
    }

    if !target.want_ip_config {
        return Ok(None);
    }
    let addresses = read_nic_addresses(&nic, target, &resource)?;
    let node_name = vm
        .properties
        .os_profile
        .as_ref()
        .and_then(|os| os.computer_name.clone())
        .unwrap_or(vm_name);
    Ok(Some(GatewayVmProfileStatus {
        node_name,
        primary_ip: Some(addresses.primary_ip),
        secondary_ip: addresses.secondary_ip,
    }))
}

#[cfg(test)]
#[path = "agentpool_tests.rs"]
mod agentpool_tests;
