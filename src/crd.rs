// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for egress gateway management.
//!
//! # Resource Types
//!
//! - [`StaticGatewayConfiguration`] - The user-facing gateway object. Owns one
//!   [`GatewayLBConfiguration`] of the same name.
//! - [`GatewayLBConfiguration`] - Drives the shared load balancer (frontend, backend
//!   pool, rule and probe). Owns one [`GatewayVMConfiguration`] of the same name.
//! - [`GatewayVMConfiguration`] - Drives the gateway IP configuration on every NIC of
//!   the selected node pool and the optional public IP prefix.
//!
//! # Example: Selecting a gateway node pool
//!
//! ```rust,no_run
//! use kube_egress_gateway::crd::{GatewayPoolProfile, StaticGatewayConfigurationSpec};
//!
//! let spec = StaticGatewayConfigurationSpec {
//!     pool: GatewayPoolProfile {
//!         gateway_nodepool_name: Some("gwpool".to_string()),
//!         ..Default::default()
//!     },
//!     provision_public_ips: true,
//!     public_ip_prefix_id: None,
//!     default_route: None,
//!     exclude_cidrs: None,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This controller reports `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Explicit scale-set selection.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayVmssProfile {
    /// Resource group of the gateway scale set.
    pub vmss_resource_group: String,

    /// Name of the gateway scale set.
    pub vmss_name: String,

    /// Length of the public IP prefix allocated for this pool (0-31).
    #[schemars(range(min = 0, max = 31))]
    pub public_ip_prefix_size: i32,
}

/// Discrete-VM pool selection.
///
/// VMs are discovered by the `aks-managed-poolName` tag inside `resourceGroup`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayVmProfile {
    /// Resource group holding the gateway VMs.
    pub resource_group: String,

    /// Value of the pool-name tag carried by every gateway VM.
    pub pool_name: String,

    /// Length of the public IP prefix allocated for this pool (0-31).
    #[schemars(range(min = 0, max = 31))]
    pub public_ip_prefix_size: i32,
}

/// Gateway node pool selector.
///
/// Exactly one of the three fields must be set.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPoolProfile {
    /// Name of a gateway node pool backed by a scale set in the node resource group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_nodepool_name: Option<String>,

    /// Explicit scale set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_vmss_profile: Option<GatewayVmssProfile>,

    /// Pool of standalone VMs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_vm_profile: Option<GatewayVmProfile>,
}

/// `StaticGatewayConfiguration` declares an egress gateway for cluster workloads.
///
/// # Example
///
/// ```yaml
/// apiVersion: egressgateway.kubernetes.azure.com/v1alpha1
/// kind: StaticGatewayConfiguration
/// metadata:
///   name: my-gateway
///   namespace: default
/// spec:
///   gatewayNodepoolName: gwpool
///   provisionPublicIps: true
///   excludeCidrs:
///     - 10.0.0.0/8
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "egressgateway.kubernetes.azure.com",
    version = "v1alpha1",
    kind = "StaticGatewayConfiguration",
    namespaced,
    shortname = "sgc",
    doc = "StaticGatewayConfiguration declares an egress gateway backed by a gateway node pool, a load balancer rule and an optional public IP prefix.",
    printcolumn = r#"{"name":"EgressPrefix","type":"string","jsonPath":".status.egressIpPrefix"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "StaticGatewayConfigurationStatus")]
#[serde(rename_all = "camelCase")]
pub struct StaticGatewayConfigurationSpec {
    /// Gateway node pool selector.
    #[serde(flatten)]
    pub pool: GatewayPoolProfile,

    /// Whether egress traffic leaves through public IPs.
    #[serde(default = "default_true")]
    pub provision_public_ips: bool,

    /// Caller-owned public IP prefix. Only honoured when `provisionPublicIps` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_prefix_id: Option<String>,

    /// Route pods take by default (`staticEgressGateway` or `azureNetworking`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_route: Option<String>,

    /// Destination CIDRs that bypass the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_cidrs: Option<Vec<String>>,
}

/// Endpoint that pods use to reach the gateway.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayServerProfile {
    /// Load balancer frontend IP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Load balancer rule port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
}

/// `StaticGatewayConfiguration` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaticGatewayConfigurationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_server_profile: Option<GatewayServerProfile>,
    /// Egress prefix CIDR, or comma-joined private IPs when no public prefix is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_ip_prefix: Option<String>,
}

/// `GatewayLBConfiguration` drives the load balancer objects of one gateway.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "egressgateway.kubernetes.azure.com",
    version = "v1alpha1",
    kind = "GatewayLBConfiguration",
    namespaced,
    shortname = "gwlbc",
    doc = "GatewayLBConfiguration holds the load balancer side of a StaticGatewayConfiguration: frontend IP, backend pool, rule and health probe.",
    printcolumn = r#"{"name":"FrontendIP","type":"string","jsonPath":".status.frontendIp"}"#,
    printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".status.serverPort"}"#
)]
#[kube(status = "GatewayLBConfigurationStatus")]
#[serde(rename_all = "camelCase")]
pub struct GatewayLBConfigurationSpec {
    /// Gateway node pool selector.
    #[serde(flatten)]
    pub pool: GatewayPoolProfile,

    /// Whether egress traffic leaves through public IPs.
    #[serde(default = "default_true")]
    pub provision_public_ips: bool,

    /// Caller-owned public IP prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_prefix_id: Option<String>,
}

/// `GatewayLBConfiguration` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayLBConfigurationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_ip_prefix: Option<String>,
}

/// `GatewayVMConfiguration` drives the per-instance gateway IP configuration.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "egressgateway.kubernetes.azure.com",
    version = "v1alpha1",
    kind = "GatewayVMConfiguration",
    namespaced,
    shortname = "gwvmc",
    doc = "GatewayVMConfiguration holds the compute side of a StaticGatewayConfiguration: the gateway IP configuration on every pool NIC and the optional public IP prefix.",
    printcolumn = r#"{"name":"EgressPrefix","type":"string","jsonPath":".status.egressIpPrefix"}"#
)]
#[kube(status = "GatewayVMConfigurationStatus")]
#[serde(rename_all = "camelCase")]
pub struct GatewayVMConfigurationSpec {
    /// Gateway node pool selector.
    #[serde(flatten)]
    pub pool: GatewayPoolProfile,

    /// Whether egress traffic leaves through public IPs.
    #[serde(default = "default_true")]
    pub provision_public_ips: bool,

    /// Caller-owned public IP prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_prefix_id: Option<String>,
}

/// Addresses of one gateway node.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayVmProfileStatus {
    /// Kubernetes node name (the instance computer name).
    pub node_name: String,
    /// Private IP of the primary IP configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_ip: Option<String>,
    /// Private IP of the gateway IP configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_ip: Option<String>,
}

/// `GatewayVMConfiguration` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayVMConfigurationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub gateway_vm_profiles: Vec<GatewayVmProfileStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_ip_prefix: Option<String>,
}

impl From<&StaticGatewayConfigurationSpec> for GatewayLBConfigurationSpec {
    fn from(spec: &StaticGatewayConfigurationSpec) -> Self {
        Self {
            pool: spec.pool.clone(),
            provision_public_ips: spec.provision_public_ips,
            public_ip_prefix_id: spec.public_ip_prefix_id.clone(),
        }
    }
}

impl From<&GatewayLBConfigurationSpec> for GatewayVMConfigurationSpec {
    fn from(spec: &GatewayLBConfigurationSpec) -> Self {
        Self {
            pool: spec.pool.clone(),
            provision_public_ips: spec.provision_public_ips,
            public_ip_prefix_id: spec.public_ip_prefix_id.clone(),
        }
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
