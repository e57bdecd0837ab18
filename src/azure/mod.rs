// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Azure cloud resource model and client.
//!
//! The convergence core only talks to the cloud through [`CloudClient`]. The
//! production implementation is [`arm::ArmClient`], which calls the Azure
//! Resource Manager REST API. Tests use [`mock::MockCloudClient`], an in-memory
//! store that behaves like ARM for the handful of operations the controller needs.
//!
//! All calls distinguish "not found" ([`CloudError::NotFound`]) and "etag
//! mismatch" ([`CloudError::Conflict`]) from every other failure.

pub mod arm;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod resource_id;
pub mod types;

pub use error::{ignore_not_found, CloudError};
pub use resource_id::ResourceId;

use async_trait::async_trait;
use types::{
    LoadBalancer, NetworkInterface, PublicIpPrefix, Subnet, VirtualMachine,
    VirtualMachineScaleSet, VirtualMachineScaleSetVm,
};

/// Cloud operations used by the egress gateway reconcilers.
///
/// Writes are full `PUT`s of the resource body. Load balancer writes and deletes
/// accept an optional etag; when present the service must reject the call with
/// [`CloudError::Conflict`] if the stored resource has a different etag.
#[async_trait]
pub trait CloudClient: Send + Sync {
    // Load balancers

    async fn get_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<LoadBalancer, CloudError>;

    async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        load_balancer: &LoadBalancer,
        if_match: Option<&str>,
    ) -> Result<LoadBalancer, CloudError>;

    async fn delete_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        if_match: Option<&str>,
    ) -> Result<(), CloudError>;

    // Scale sets

    async fn list_vmss(&self, resource_group: &str)
        -> Result<Vec<VirtualMachineScaleSet>, CloudError>;

    async fn get_vmss(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachineScaleSet, CloudError>;

    async fn create_or_update_vmss(
        &self,
        resource_group: &str,
        name: &str,
        vmss: &VirtualMachineScaleSet,
    ) -> Result<VirtualMachineScaleSet, CloudError>;

    // Scale set instances

    async fn list_vmss_vms(
        &self,
        resource_group: &str,
        vmss_name: &str,
    ) -> Result<Vec<VirtualMachineScaleSetVm>, CloudError>;

    async fn get_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
    ) -> Result<VirtualMachineScaleSetVm, CloudError>;

    async fn update_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        vm: &VirtualMachineScaleSetVm,
    ) -> Result<VirtualMachineScaleSetVm, CloudError>;

    // Standalone virtual machines

    async fn list_vms(&self, resource_group: &str) -> Result<Vec<VirtualMachine>, CloudError>;

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, CloudError>;

    async fn create_or_update_vm(
        &self,
        resource_group: &str,
        name: &str,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, CloudError>;

    // Network interfaces

    async fn get_nic(&self, resource_group: &str, name: &str)
        -> Result<NetworkInterface, CloudError>;

    /// NIC of a scale set instance, as materialized from the instance model.
    async fn get_vmss_vm_nic(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        nic_name: &str,
    ) -> Result<NetworkInterface, CloudError>;

    async fn create_or_update_nic(
        &self,
        resource_group: &str,
        name: &str,
        nic: &NetworkInterface,
    ) -> Result<NetworkInterface, CloudError>;

    // Public IP prefixes

    async fn get_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<PublicIpPrefix, CloudError>;

    async fn create_or_update_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
        prefix: &PublicIpPrefix,
    ) -> Result<PublicIpPrefix, CloudError>;

    async fn delete_public_ip_prefix(&self, resource_group: &str, name: &str)
        -> Result<(), CloudError>;

    // Subnets

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, CloudError>;
}
