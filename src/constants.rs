// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the egress gateway controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance. Values that other
//! components depend on (names, paths, port ranges) must stay bit-exact.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all egress gateway CRDs
pub const API_GROUP: &str = "egressgateway.kubernetes.azure.com";

/// API version for all egress gateway CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "egressgateway.kubernetes.azure.com/v1alpha1";

/// Kind name for `StaticGatewayConfiguration` resource
pub const KIND_STATIC_GATEWAY_CONFIGURATION: &str = "StaticGatewayConfiguration";

/// Kind name for `GatewayLBConfiguration` resource
pub const KIND_GATEWAY_LB_CONFIGURATION: &str = "GatewayLBConfiguration";

/// Kind name for `GatewayVMConfiguration` resource
pub const KIND_GATEWAY_VM_CONFIGURATION: &str = "GatewayVMConfiguration";

// ============================================================================
// Load Balancer Constants
// ============================================================================

/// First port (inclusive) handed out to gateway LB rules
pub const LB_PORT_RANGE_START: i32 = 6000;

/// Last port (exclusive) handed out to gateway LB rules
pub const LB_PORT_RANGE_END: i32 = 7000;

/// Request path prefix of the per-gateway health probe; the owner UID is appended
pub const GATEWAY_HEALTH_PROBE_PATH_PREFIX: &str = "/gw/";

/// Default port of the gateway health probe endpoint on each node
pub const DEFAULT_HEALTH_PROBE_PORT: i32 = 8082;

/// SKU used for a load balancer synthesized by the controller
pub const LB_SKU_STANDARD: &str = "Standard";

// ============================================================================
// Public IP Prefix Constants
// ============================================================================

/// Name prefix of controller-managed public IP prefixes; the VM config UID is appended
pub const MANAGED_PUBLIC_IP_PREFIX_NAME_PREFIX: &str = "egressgateway";

/// Smallest accepted public IP prefix length
pub const MIN_PUBLIC_IP_PREFIX_LENGTH: i32 = 0;

/// Largest accepted public IP prefix length
pub const MAX_PUBLIC_IP_PREFIX_LENGTH: i32 = 31;

/// Prefix length used when a node pool carries no prefix-size tag
pub const DEFAULT_PUBLIC_IP_PREFIX_LENGTH: i32 = 31;

/// SKU name for managed public IP prefixes
pub const PUBLIC_IP_PREFIX_SKU_NAME: &str = "Standard";

/// SKU tier for managed public IP prefixes
pub const PUBLIC_IP_PREFIX_SKU_TIER: &str = "Regional";

// ============================================================================
// Node Pool Discovery Constants
// ============================================================================

/// Tag carrying the node pool name on scale sets and VMs
pub const POOL_NAME_TAG: &str = "aks-managed-poolName";

/// Tag carrying the gateway public IP prefix size on gateway node pools
pub const GATEWAY_PREFIX_SIZE_TAG: &str = "aks-managed-gatewayIPPrefixSize";

/// Provisioning state that forces an instance update on every reconcile
pub const PROVISIONING_STATE_FAILED: &str = "Failed";

// ============================================================================
// Azure Resource Manager Constants
// ============================================================================

/// Default Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// API version for Microsoft.Network resources
pub const NETWORK_API_VERSION: &str = "2023-09-01";

/// API version for Microsoft.Compute resources
pub const COMPUTE_API_VERSION: &str = "2024-03-01";

/// API version for NICs read through a scale set instance
pub const VMSS_NIC_API_VERSION: &str = "2018-10-01";

/// HTTP request timeout for ARM calls (seconds)
pub const ARM_REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration for healthy resources (5 minutes)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

/// Requeue duration while waiting on a child resource (10 seconds)
pub const PENDING_REQUEUE_DURATION_SECS: u64 = 10;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager used for server-side apply of owned objects
pub const FIELD_MANAGER: &str = "kube-egress-gateway";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Default bind address for metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";
