// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Value for `app.kubernetes.io/part-of` on objects created by this controller
pub const PART_OF_EGRESS_GATEWAY: &str = "kube-egress-gateway";

/// Value for `app.kubernetes.io/managed-by` on objects created by the LB-level reconciler
pub const MANAGED_BY_GATEWAY_LB_CONFIGURATION: &str = "GatewayLBConfiguration";

/// Value for `app.kubernetes.io/managed-by` on objects created by the top-level reconciler
pub const MANAGED_BY_STATIC_GATEWAY_CONFIGURATION: &str = "StaticGatewayConfiguration";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `GatewayLBConfiguration` resources
pub const FINALIZER_LB_CONFIGURATION: &str =
    "egressgateway.kubernetes.azure.com/lb-configuration";

/// Finalizer for `GatewayVMConfiguration` resources
pub const FINALIZER_VM_CONFIGURATION: &str =
    "egressgateway.kubernetes.azure.com/vm-configuration";
