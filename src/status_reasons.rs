// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for egress gateway resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. Every resource reports a single `type: Ready` condition.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: PortsExhausted
//!       message: "no free load balancer port left in [6000, 7000)"
//! ```

/// The encompassing condition type reported by every resource.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Progress Reasons
// ============================================================================

/// Resource converged; every cloud object matches the desired state.
pub const REASON_READY: &str = "Ready";

/// Convergence is underway or waiting on a child object.
pub const REASON_PROGRESSING: &str = "Progressing";

/// Resource is being deleted and cloud-side cleanup is underway.
pub const REASON_DELETING: &str = "Deleting";

// ============================================================================
// Configuration Reasons (fixed only by changing the spec)
// ============================================================================

/// None or more than one node pool selector is set.
pub const REASON_INVALID_POOL_SELECTOR: &str = "InvalidPoolSelector";

/// A resource ID could not be parsed.
pub const REASON_INVALID_RESOURCE_ID: &str = "InvalidResourceId";

/// A referenced resource lives in another subscription.
pub const REASON_SUBSCRIPTION_MISMATCH: &str = "SubscriptionMismatch";

/// Public IP prefix length is outside [0, 31] or disagrees with the pool.
pub const REASON_INVALID_PREFIX_LENGTH: &str = "InvalidPrefixLength";

/// Controller configuration is incomplete.
pub const REASON_INVALID_CONFIG: &str = "InvalidConfig";

// ============================================================================
// Cloud State Reasons
// ============================================================================

/// An existing load balancer rule violates the port invariants.
pub const REASON_INVALID_LB_PORT: &str = "InvalidLoadBalancerPort";

/// Every port in the allocation range is taken.
pub const REASON_PORTS_EXHAUSTED: &str = "PortsExhausted";

/// Discovered cloud state does not have the shape the controller requires.
pub const REASON_MALFORMED_CLOUD_STATE: &str = "MalformedCloudState";

/// A resource the controller only references does not exist.
pub const REASON_RESOURCE_NOT_FOUND: &str = "ResourceNotFound";

/// The load balancer changed between read and write.
pub const REASON_CONFLICT: &str = "Conflict";

/// A cloud API call failed.
pub const REASON_CLOUD_API_ERROR: &str = "CloudApiError";
