// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`CloudClient`] for unit testing.
//!
//! The mock keeps every resource in a shared store and mimics the parts of ARM
//! behaviour the reconcilers depend on:
//!
//! - sub-resource IDs are assigned on write
//! - dynamic private IPs are allocated for frontends and NIC IP configurations
//! - every load balancer write gets a fresh etag and `If-Match` is enforced
//! - scale set instance NICs are materialized from the instance model
//!
//! Writes are counted per resource kind so tests can assert idempotence.

use super::error::CloudError;
use super::resource_id::{load_balancer_id, public_ip_prefix_id, ResourceId};
use super::types::*;
use super::CloudClient;
use crate::constants::POOL_NAME_TAG;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Number of mutating calls per resource kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub load_balancer_writes: usize,
    pub load_balancer_deletes: usize,
    pub vmss_writes: usize,
    pub vmss_vm_writes: usize,
    pub vm_writes: usize,
    pub nic_writes: usize,
    pub public_ip_prefix_writes: usize,
    pub public_ip_prefix_deletes: usize,
}

impl WriteCounts {
    /// Sum of every write and delete.
    #[must_use]
    pub fn total(&self) -> usize {
        self.load_balancer_writes
            + self.load_balancer_deletes
            + self.vmss_writes
            + self.vmss_vm_writes
            + self.vm_writes
            + self.nic_writes
            + self.public_ip_prefix_writes
            + self.public_ip_prefix_deletes
    }
}

#[derive(Default)]
struct MockState {
    load_balancers: BTreeMap<String, LoadBalancer>,
    vmss: BTreeMap<String, VirtualMachineScaleSet>,
    vmss_vms: BTreeMap<String, VirtualMachineScaleSetVm>,
    vmss_vm_nics: BTreeMap<String, NetworkInterface>,
    vms: BTreeMap<String, VirtualMachine>,
    nics: BTreeMap<String, NetworkInterface>,
    prefixes: BTreeMap<String, PublicIpPrefix>,
    subnets: BTreeMap<String, Subnet>,
    writes: WriteCounts,
    next_ip: u32,
    next_etag: u64,
    next_prefix: u32,
}

impl MockState {
    fn allocate_private_ip(&mut self) -> String {
        self.next_ip += 1;
        format!("10.243.{}.{}", self.next_ip / 250, 4 + self.next_ip % 250)
    }

    fn next_etag(&mut self) -> String {
        self.next_etag += 1;
        format!("W/\"{}\"", self.next_etag)
    }
}

fn key(parts: &[&str]) -> String {
    parts.join("/").to_ascii_lowercase()
}

fn in_group(key: &str, resource_group: &str) -> bool {
    key.starts_with(&format!("{}/", resource_group.to_ascii_lowercase()))
}

/// In-memory cloud client.
#[derive(Clone)]
pub struct MockCloudClient {
    subscription_id: String,
    state: Arc<Mutex<MockState>>,
}

impl MockCloudClient {
    /// Create an empty mock for the given subscription.
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Write counters since creation.
    #[must_use]
    pub fn writes(&self) -> WriteCounts {
        self.lock().writes
    }

    // ------------------------------------------------------------------
    // Test setup
    // ------------------------------------------------------------------

    /// Seed a load balancer; it goes through the normal write path, without counting.
    pub fn insert_load_balancer(&self, resource_group: &str, name: &str, lb: LoadBalancer) {
        self.store_load_balancer(resource_group, name, lb);
        self.lock().writes.load_balancer_writes -= 1;
    }

    /// Bump a load balancer's etag, as if another writer modified it.
    pub fn touch_load_balancer(&self, resource_group: &str, name: &str) {
        let mut state = self.lock();
        let etag = state.next_etag();
        if let Some(lb) = state.load_balancers.get_mut(&key(&[resource_group, name])) {
            lb.etag = Some(etag);
        }
    }

    pub fn insert_vmss(&self, resource_group: &str, vmss: VirtualMachineScaleSet) {
        let name = vmss.name.clone().unwrap_or_default();
        self.lock().vmss.insert(key(&[resource_group, &name]), vmss);
    }

    /// Seed a scale set instance and materialize its NICs.
    pub fn insert_vmss_vm(&self, resource_group: &str, vmss_name: &str, vm: VirtualMachineScaleSetVm) {
        let mut state = self.lock();
        let instance_id = vm.instance_id.clone().unwrap_or_default();
        self.materialize_instance_nics(&mut state, resource_group, vmss_name, &instance_id, &vm);
        state
            .vmss_vms
            .insert(key(&[resource_group, vmss_name, &instance_id]), vm);
    }

    pub fn insert_vm(&self, resource_group: &str, vm: VirtualMachine) {
        let name = vm.name.clone().unwrap_or_default();
        self.lock().vms.insert(key(&[resource_group, &name]), vm);
    }

    /// Seed a NIC, allocating private IPs where missing.
    pub fn insert_nic(&self, resource_group: &str, nic: NetworkInterface) {
        let name = nic.name.clone().unwrap_or_default();
        let mut state = self.lock();
        let stored = self.prepare_nic(&mut state, resource_group, &name, &nic);
        state.nics.insert(key(&[resource_group, &name]), stored);
    }

    pub fn insert_public_ip_prefix(&self, resource_group: &str, prefix: PublicIpPrefix) {
        let name = prefix.name.clone().unwrap_or_default();
        self.lock()
            .prefixes
            .insert(key(&[resource_group, &name]), prefix);
    }

    pub fn insert_subnet(&self, resource_group: &str, vnet_name: &str, subnet: Subnet) {
        let name = subnet.name.clone().unwrap_or_default();
        self.lock()
            .subnets
            .insert(key(&[resource_group, vnet_name, &name]), subnet);
    }

    /// Seed a scale set tagged with `pool_name` plus `instances` members, each with
    /// one primary NIC whose primary IP configuration sits on `subnet_id`.
    pub fn seed_scale_set_pool(
        &self,
        resource_group: &str,
        vmss_name: &str,
        pool_name: &str,
        unique_id: &str,
        subnet_id: &str,
        instances: usize,
    ) {
        let network_profile = VirtualMachineScaleSetNetworkProfile {
            network_interface_configurations: vec![VirtualMachineScaleSetNetworkConfiguration {
                name: format!("{vmss_name}-nic"),
                properties: VirtualMachineScaleSetNetworkConfigurationProperties {
                    primary: Some(true),
                    ip_configurations: vec![VirtualMachineScaleSetIpConfiguration {
                        name: "ipconfig1".to_string(),
                        properties: VirtualMachineScaleSetIpConfigurationProperties {
                            primary: Some(true),
                            private_ip_address_version: Some(IpVersion::IPv4),
                            subnet: Some(SubResource::new(subnet_id)),
                            ..Default::default()
                        },
                    }],
                    ..Default::default()
                },
            }],
            ..Default::default()
        };

        self.insert_vmss(
            resource_group,
            VirtualMachineScaleSet {
                id: Some(
                    ResourceId::new(
                        &self.subscription_id,
                        resource_group,
                        "Microsoft.Compute",
                        "virtualMachineScaleSets",
                        vmss_name,
                    )
                    .to_string(),
                ),
                name: Some(vmss_name.to_string()),
                tags: BTreeMap::from([(POOL_NAME_TAG.to_string(), pool_name.to_string())]),
                properties: VirtualMachineScaleSetProperties {
                    unique_id: Some(unique_id.to_string()),
                    provisioning_state: Some("Succeeded".to_string()),
                    virtual_machine_profile: Some(VirtualMachineScaleSetVmProfile {
                        network_profile: Some(network_profile.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            },
        );

        for i in 0..instances {
            self.insert_vmss_vm(
                resource_group,
                vmss_name,
                VirtualMachineScaleSetVm {
                    name: Some(format!("{vmss_name}_{i}")),
                    instance_id: Some(i.to_string()),
                    properties: VirtualMachineScaleSetVmProperties {
                        provisioning_state: Some("Succeeded".to_string()),
                        os_profile: Some(OsProfile {
                            computer_name: Some(format!("{vmss_name}{i:06}")),
                            ..Default::default()
                        }),
                        network_profile_configuration: Some(network_profile.clone()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            );
        }
    }

    /// Seed `count` standalone VMs tagged with `pool_name`, each with its own NIC.
    pub fn seed_vm_pool(&self, resource_group: &str, pool_name: &str, subnet_id: &str, count: usize) {
        for i in 0..count {
            let vm_name = format!("{pool_name}-vm-{i}");
            let nic_name = format!("{vm_name}-nic");
            self.insert_nic(
                resource_group,
                NetworkInterface {
                    name: Some(nic_name.clone()),
                    properties: NetworkInterfaceProperties {
                        primary: Some(true),
                        ip_configurations: vec![InterfaceIpConfiguration {
                            id: None,
                            name: "ipconfig1".to_string(),
                            properties: InterfaceIpConfigurationProperties {
                                primary: Some(true),
                                private_ip_address_version: Some(IpVersion::IPv4),
                                private_ip_allocation_method: Some(IpAllocationMethod::Dynamic),
                                subnet: Some(SubResource::new(subnet_id)),
                                ..Default::default()
                            },
                        }],
                        ..Default::default()
                    },
                    ..Default::default()
                },
            );
            let nic_id = ResourceId::new(
                &self.subscription_id,
                resource_group,
                "Microsoft.Network",
                "networkInterfaces",
                &nic_name,
            );
            self.insert_vm(
                resource_group,
                VirtualMachine {
                    name: Some(vm_name.clone()),
                    tags: BTreeMap::from([(POOL_NAME_TAG.to_string(), pool_name.to_string())]),
                    properties: VirtualMachineProperties {
                        provisioning_state: Some("Succeeded".to_string()),
                        os_profile: Some(OsProfile {
                            computer_name: Some(vm_name),
                            ..Default::default()
                        }),
                        network_profile: Some(VirtualMachineNetworkProfile {
                            network_interfaces: vec![NetworkInterfaceReference {
                                id: nic_id.to_string(),
                                properties: NetworkInterfaceReferenceProperties { primary: Some(true) },
                            }],
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            );
        }
    }

    // ------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------

    #[must_use]
    pub fn load_balancer(&self, resource_group: &str, name: &str) -> Option<LoadBalancer> {
        self.lock()
            .load_balancers
            .get(&key(&[resource_group, name]))
            .cloned()
    }

    #[must_use]
    pub fn vmss(&self, resource_group: &str, name: &str) -> Option<VirtualMachineScaleSet> {
        self.lock().vmss.get(&key(&[resource_group, name])).cloned()
    }

    #[must_use]
    pub fn vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
    ) -> Option<VirtualMachineScaleSetVm> {
        self.lock()
            .vmss_vms
            .get(&key(&[resource_group, vmss_name, instance_id]))
            .cloned()
    }

    #[must_use]
    pub fn nic(&self, resource_group: &str, name: &str) -> Option<NetworkInterface> {
        self.lock().nics.get(&key(&[resource_group, name])).cloned()
    }

    #[must_use]
    pub fn public_ip_prefix(&self, resource_group: &str, name: &str) -> Option<PublicIpPrefix> {
        self.lock()
            .prefixes
            .get(&key(&[resource_group, name]))
            .cloned()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn store_load_balancer(&self, resource_group: &str, name: &str, lb: LoadBalancer) -> LoadBalancer {
        let mut state = self.lock();
        let lb_id = load_balancer_id(&self.subscription_id, resource_group, name);
        let mut stored = lb;
        stored.id = Some(lb_id.to_string());
        stored.name = Some(name.to_string());
        stored.properties.provisioning_state = Some("Succeeded".to_string());

        for frontend in &mut stored.properties.frontend_ip_configurations {
            frontend.id = Some(lb_id.child("frontendIPConfigurations", &frontend.name));
            if frontend.properties.private_ip_address.is_none() {
                frontend.properties.private_ip_address = Some(state.allocate_private_ip());
            }
            frontend
                .properties
                .private_ip_address_version
                .get_or_insert(IpVersion::IPv4);
        }
        for pool in &mut stored.properties.backend_address_pools {
            pool.id = Some(lb_id.child("backendAddressPools", &pool.name));
        }
        for rule in &mut stored.properties.load_balancing_rules {
            rule.id = Some(lb_id.child("loadBalancingRules", &rule.name));
        }
        for probe in &mut stored.properties.probes {
            probe.id = Some(lb_id.child("probes", &probe.name));
        }

        stored.etag = Some(state.next_etag());
        state.writes.load_balancer_writes += 1;
        state
            .load_balancers
            .insert(key(&[resource_group, name]), stored.clone());
        stored
    }

    /// Assign IDs and private IPs, keeping addresses already handed out.
    fn prepare_nic(
        &self,
        state: &mut MockState,
        resource_group: &str,
        name: &str,
        nic: &NetworkInterface,
    ) -> NetworkInterface {
        let nic_id = ResourceId::new(
            &self.subscription_id,
            resource_group,
            "Microsoft.Network",
            "networkInterfaces",
            name,
        );
        let previous = state.nics.get(&key(&[resource_group, name])).cloned();

        let mut stored = nic.clone();
        stored.id = Some(nic_id.to_string());
        stored.name = Some(name.to_string());
        stored.properties.provisioning_state = Some("Succeeded".to_string());
        for ip_config in &mut stored.properties.ip_configurations {
            ip_config.id = Some(nic_id.child("ipConfigurations", &ip_config.name));
            if ip_config.properties.private_ip_address.is_none() {
                let kept = previous.as_ref().and_then(|p| {
                    p.properties
                        .ip_configurations
                        .iter()
                        .find(|c| c.name == ip_config.name)
                        .and_then(|c| c.properties.private_ip_address.clone())
                });
                ip_config.properties.private_ip_address =
                    Some(kept.unwrap_or_else(|| state.allocate_private_ip()));
            }
        }
        stored.etag = Some(state.next_etag());
        stored
    }

    /// Rebuild the live NICs of a scale set instance from its network profile.
    fn materialize_instance_nics(
        &self,
        state: &mut MockState,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        vm: &VirtualMachineScaleSetVm,
    ) {
        let Some(profile) = vm.properties.network_profile_configuration.as_ref() else {
            return;
        };
        for nic_config in &profile.network_interface_configurations {
            let nic_key = key(&[resource_group, vmss_name, instance_id, &nic_config.name]);
            let previous = state.vmss_vm_nics.get(&nic_key).cloned();

            let mut ip_configurations = Vec::new();
            for ip_config in &nic_config.properties.ip_configurations {
                let kept = previous.as_ref().and_then(|p| {
                    p.properties
                        .ip_configurations
                        .iter()
                        .find(|c| c.name == ip_config.name)
                        .and_then(|c| c.properties.private_ip_address.clone())
                });
                let private_ip = kept.unwrap_or_else(|| state.allocate_private_ip());
                ip_configurations.push(InterfaceIpConfiguration {
                    id: None,
                    name: ip_config.name.clone(),
                    properties: InterfaceIpConfigurationProperties {
                        primary: ip_config.properties.primary,
                        private_ip_address: Some(private_ip),
                        private_ip_address_version: ip_config.properties.private_ip_address_version,
                        private_ip_allocation_method: Some(IpAllocationMethod::Dynamic),
                        subnet: ip_config.properties.subnet.clone(),
                        public_ip_address: ip_config
                            .properties
                            .public_ip_address_configuration
                            .as_ref()
                            .map(|public| PublicIpAddress {
                                id: None,
                                name: Some(public.name.clone()),
                                properties: public.properties.clone(),
                            }),
                        load_balancer_backend_address_pools: ip_config
                            .properties
                            .load_balancer_backend_address_pools
                            .clone(),
                        ..Default::default()
                    },
                });
            }

            let nic = NetworkInterface {
                id: None,
                name: Some(nic_config.name.clone()),
                location: None,
                etag: None,
                properties: NetworkInterfaceProperties {
                    primary: nic_config.properties.primary,
                    ip_configurations,
                    provisioning_state: Some("Succeeded".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            };
            state.vmss_vm_nics.insert(nic_key, nic);
        }
    }
}

#[async_trait]
impl CloudClient for MockCloudClient {
    async fn get_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<LoadBalancer, CloudError> {
        self.load_balancer(resource_group, name)
            .ok_or_else(|| CloudError::not_found("loadBalancer", name))
    }

    async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        load_balancer: &LoadBalancer,
        if_match: Option<&str>,
    ) -> Result<LoadBalancer, CloudError> {
        if let Some(expected) = if_match {
            let current = self
                .load_balancer(resource_group, name)
                .and_then(|lb| lb.etag);
            if current.as_deref() != Some(expected) {
                return Err(CloudError::Conflict {
                    resource: name.to_string(),
                });
            }
        }
        Ok(self.store_load_balancer(resource_group, name, load_balancer.clone()))
    }

    async fn delete_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        if_match: Option<&str>,
    ) -> Result<(), CloudError> {
        let mut state = self.lock();
        let lb_key = key(&[resource_group, name]);
        if let Some(expected) = if_match {
            let current = state.load_balancers.get(&lb_key).and_then(|lb| lb.etag.clone());
            if current.as_deref() != Some(expected) {
                return Err(CloudError::Conflict {
                    resource: name.to_string(),
                });
            }
        }
        state.load_balancers.remove(&lb_key);
        state.writes.load_balancer_deletes += 1;
        Ok(())
    }

    async fn list_vmss(
        &self,
        resource_group: &str,
    ) -> Result<Vec<VirtualMachineScaleSet>, CloudError> {
        Ok(self
            .lock()
            .vmss
            .iter()
            .filter(|(k, _)| in_group(k, resource_group))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn get_vmss(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachineScaleSet, CloudError> {
        self.vmss(resource_group, name)
            .ok_or_else(|| CloudError::not_found("virtualMachineScaleSet", name))
    }

    async fn create_or_update_vmss(
        &self,
        resource_group: &str,
        name: &str,
        vmss: &VirtualMachineScaleSet,
    ) -> Result<VirtualMachineScaleSet, CloudError> {
        let mut state = self.lock();
        let mut stored = vmss.clone();
        stored.properties.provisioning_state = Some("Succeeded".to_string());
        state.writes.vmss_writes += 1;
        state.vmss.insert(key(&[resource_group, name]), stored.clone());
        Ok(stored)
    }

    async fn list_vmss_vms(
        &self,
        resource_group: &str,
        vmss_name: &str,
    ) -> Result<Vec<VirtualMachineScaleSetVm>, CloudError> {
        let prefix = format!("{}/", key(&[resource_group, vmss_name]));
        Ok(self
            .lock()
            .vmss_vms
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn get_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
    ) -> Result<VirtualMachineScaleSetVm, CloudError> {
        self.vmss_vm(resource_group, vmss_name, instance_id)
            .ok_or_else(|| CloudError::not_found("virtualMachineScaleSetVM", instance_id))
    }

    async fn update_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        vm: &VirtualMachineScaleSetVm,
    ) -> Result<VirtualMachineScaleSetVm, CloudError> {
        let mut state = self.lock();
        let vm_key = key(&[resource_group, vmss_name, instance_id]);
        if !state.vmss_vms.contains_key(&vm_key) {
            return Err(CloudError::not_found("virtualMachineScaleSetVM", instance_id));
        }
        let mut stored = vm.clone();
        stored.properties.provisioning_state = Some("Succeeded".to_string());
        self.materialize_instance_nics(&mut state, resource_group, vmss_name, instance_id, &stored);
        state.writes.vmss_vm_writes += 1;
        state.vmss_vms.insert(vm_key, stored.clone());
        Ok(stored)
    }

    async fn list_vms(&self, resource_group: &str) -> Result<Vec<VirtualMachine>, CloudError> {
        Ok(self
            .lock()
            .vms
            .iter()
            .filter(|(k, _)| in_group(k, resource_group))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, CloudError> {
        self.lock()
            .vms
            .get(&key(&[resource_group, name]))
            .cloned()
            .ok_or_else(|| CloudError::not_found("virtualMachine", name))
    }

    async fn create_or_update_vm(
        &self,
        resource_group: &str,
        name: &str,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, CloudError> {
        let mut state = self.lock();
        let mut stored = vm.clone();
        stored.properties.provisioning_state = Some("Succeeded".to_string());
        state.writes.vm_writes += 1;
        state.vms.insert(key(&[resource_group, name]), stored.clone());
        Ok(stored)
    }

    async fn get_nic(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<NetworkInterface, CloudError> {
        self.nic(resource_group, name)
            .ok_or_else(|| CloudError::not_found("networkInterface", name))
    }

    async fn get_vmss_vm_nic(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        nic_name: &str,
    ) -> Result<NetworkInterface, CloudError> {
        self.lock()
            .vmss_vm_nics
            .get(&key(&[resource_group, vmss_name, instance_id, nic_name]))
            .cloned()
            .ok_or_else(|| CloudError::not_found("networkInterface", nic_name))
    }

    async fn create_or_update_nic(
        &self,
        resource_group: &str,
        name: &str,
        nic: &NetworkInterface,
    ) -> Result<NetworkInterface, CloudError> {
        let mut state = self.lock();
        let stored = self.prepare_nic(&mut state, resource_group, name, nic);
        state.writes.nic_writes += 1;
        state.nics.insert(key(&[resource_group, name]), stored.clone());
        Ok(stored)
    }

    async fn get_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<PublicIpPrefix, CloudError> {
        self.public_ip_prefix(resource_group, name)
            .ok_or_else(|| CloudError::not_found("publicIPPrefix", name))
    }

    async fn create_or_update_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
        prefix: &PublicIpPrefix,
    ) -> Result<PublicIpPrefix, CloudError> {
        let mut state = self.lock();
        let prefix_key = key(&[resource_group, name]);
        let mut stored = prefix.clone();
        stored.id = Some(public_ip_prefix_id(&self.subscription_id, resource_group, name));
        stored.name = Some(name.to_string());
        let existing_cidr = state
            .prefixes
            .get(&prefix_key)
            .and_then(|p| p.properties.ip_prefix.clone());
        let cidr = match existing_cidr {
            Some(cidr) => cidr,
            None => {
                state.next_prefix += 1;
                format!(
                    "203.0.{}.0/{}",
                    state.next_prefix,
                    prefix.properties.prefix_length.unwrap_or(31)
                )
            }
        };
        stored.properties.ip_prefix = Some(cidr);
        state.writes.public_ip_prefix_writes += 1;
        state.prefixes.insert(prefix_key, stored.clone());
        Ok(stored)
    }

    async fn delete_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<(), CloudError> {
        let mut state = self.lock();
        if state.prefixes.remove(&key(&[resource_group, name])).is_none() {
            return Err(CloudError::not_found("publicIPPrefix", name));
        }
        state.writes.public_ip_prefix_deletes += 1;
        Ok(())
    }

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, CloudError> {
        self.lock()
            .subnets
            .get(&key(&[resource_group, vnet_name, subnet_name]))
            .cloned()
            .ok_or_else(|| CloudError::not_found("subnet", subnet_name))
    }
}
