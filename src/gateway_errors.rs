// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Convergence error types for the egress gateway controller.
//!
//! These errors cover the two classes of terminal failure a reconcile pass can hit:
//!
//! - **Configuration errors** - the spec or controller configuration is wrong and
//!   must be corrected by an operator.
//! - **Malformed cloud state** - a discovered resource does not have the shape the
//!   controller needs. The controller never repairs state it does not own.
//!
//! Transient cloud failures are [`crate::azure::CloudError`]s instead.

use crate::azure::CloudError;
use crate::status_reasons::{
    REASON_CLOUD_API_ERROR, REASON_CONFLICT, REASON_INVALID_CONFIG, REASON_INVALID_LB_PORT,
    REASON_INVALID_POOL_SELECTOR, REASON_INVALID_PREFIX_LENGTH, REASON_INVALID_RESOURCE_ID,
    REASON_MALFORMED_CLOUD_STATE, REASON_PORTS_EXHAUSTED, REASON_RESOURCE_NOT_FOUND,
    REASON_SUBSCRIPTION_MISMATCH,
};
use thiserror::Error;

/// Errors raised by the convergence core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// None, or more than one, of the node pool selectors is set.
    #[error("exactly one of gatewayNodepoolName, gatewayVmssProfile or gatewayVmProfile must be set (found {count})")]
    InvalidPoolSelector {
        /// How many selectors were set
        count: usize,
    },

    /// A resource ID is not a well-formed ARM ID.
    #[error("failed to parse resource id '{id}': {reason}")]
    InvalidResourceId {
        /// The offending ID
        id: String,
        /// What is missing or malformed
        reason: String,
    },

    /// A caller-supplied resource belongs to another subscription.
    #[error("resource '{id}' is in subscription {found}, controller runs in {expected}")]
    SubscriptionMismatch {
        /// The offending ID
        id: String,
        /// Subscription the controller is configured for
        expected: String,
        /// Subscription in the ID
        found: String,
    },

    /// A prefix length outside of [0, 31].
    #[error("public IP prefix length {length} is outside of [0, 31]")]
    InvalidPrefixLength {
        /// The rejected length
        length: i32,
    },

    /// A caller-supplied prefix does not have the pool's configured length.
    #[error("public IP prefix '{id}' has length {found:?}, pool requires {expected}")]
    PrefixLengthMismatch {
        /// The BYO prefix
        id: String,
        /// Pool prefix length
        expected: i32,
        /// Length reported by the prefix
        found: Option<i32>,
    },

    /// An existing rule sharing the backend pool breaks the port invariants.
    #[error("found rule with invalid LB port: rule '{rule}' frontend={frontend_port:?} backend={backend_port:?}")]
    InvalidLbPort {
        /// Rule name
        rule: String,
        /// Frontend port on the rule
        frontend_port: Option<i32>,
        /// Backend port on the rule
        backend_port: Option<i32>,
    },

    /// All ports of the allocation range are in use.
    #[error("no free load balancer port left in [{start}, {end})")]
    PortsExhausted {
        /// Inclusive range start
        start: i32,
        /// Exclusive range end
        end: i32,
    },

    /// A frontend exists but has no IPv4 private address.
    #[error("load balancer frontend '{name}' is malformed: {reason}")]
    MalformedFrontend {
        /// Frontend name
        name: String,
        /// What is missing
        reason: String,
    },

    /// A scale set, instance or VM has no network profile.
    #[error("{resource} has no network profile")]
    MissingNetworkProfile {
        /// Human-readable resource name
        resource: String,
    },

    /// No network interface is flagged primary.
    #[error("{resource} has no primary network interface")]
    MissingPrimaryNic {
        /// Human-readable resource name
        resource: String,
    },

    /// A network interface has no primary IP configuration.
    #[error("network interface of {resource} has no primary IP configuration")]
    MissingPrimaryIpConfig {
        /// Human-readable resource name
        resource: String,
    },

    /// The gateway IP configuration lacks the expected public IP association.
    #[error("gateway IP configuration '{ip_config}' on {resource} has no public IP address configuration")]
    MissingPublicIp {
        /// Human-readable resource name
        resource: String,
        /// Gateway IP configuration name
        ip_config: String,
    },

    /// A written IP configuration came back without a private address.
    #[error("IP configuration '{ip_config}' on {resource} has no private IP address")]
    MissingPrivateIp {
        /// Human-readable resource name
        resource: String,
        /// IP configuration name
        ip_config: String,
    },

    /// The pool has no provider-assigned unique ID.
    #[error("agent pool '{pool}' has no unique id")]
    MissingUniqueId {
        /// Pool description
        pool: String,
    },

    /// No scale set or VM carries the pool tag.
    #[error("no scale set or virtual machine found for pool '{pool}' in resource group {resource_group}")]
    PoolNotFound {
        /// Pool name
        pool: String,
        /// Resource group that was searched
        resource_group: String,
    },

    /// A resource the controller only references is missing.
    #[error("{kind} '{name}' not found")]
    ReferencedResourceNotFound {
        /// Resource kind
        kind: String,
        /// Resource name or ID
        name: String,
    },

    /// The controller configuration is incomplete or invalid.
    #[error("invalid controller configuration: {reason}")]
    InvalidConfig {
        /// What is wrong
        reason: String,
    },
}

impl GatewayError {
    /// Map the error to a status condition reason.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPoolSelector { .. } => REASON_INVALID_POOL_SELECTOR,
            Self::InvalidResourceId { .. } => REASON_INVALID_RESOURCE_ID,
            Self::SubscriptionMismatch { .. } => REASON_SUBSCRIPTION_MISMATCH,
            Self::InvalidPrefixLength { .. } | Self::PrefixLengthMismatch { .. } => {
                REASON_INVALID_PREFIX_LENGTH
            }
            Self::InvalidLbPort { .. } => REASON_INVALID_LB_PORT,
            Self::PortsExhausted { .. } => REASON_PORTS_EXHAUSTED,
            Self::MalformedFrontend { .. }
            | Self::MissingNetworkProfile { .. }
            | Self::MissingPrimaryNic { .. }
            | Self::MissingPrimaryIpConfig { .. }
            | Self::MissingPublicIp { .. }
            | Self::MissingPrivateIp { .. }
            | Self::MissingUniqueId { .. } => REASON_MALFORMED_CLOUD_STATE,
            Self::PoolNotFound { .. } | Self::ReferencedResourceNotFound { .. } => {
                REASON_RESOURCE_NOT_FOUND
            }
            Self::InvalidConfig { .. } => REASON_INVALID_CONFIG,
        }
    }

    /// Whether the error can only be fixed by changing the spec or controller config.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPoolSelector { .. }
                | Self::InvalidResourceId { .. }
                | Self::SubscriptionMismatch { .. }
                | Self::InvalidPrefixLength { .. }
                | Self::PrefixLengthMismatch { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

/// Pick the condition reason for any error surfaced by a reconcile pass.
#[must_use]
pub fn reason_for_error(err: &anyhow::Error) -> &'static str {
    if let Some(gateway_err) = err.downcast_ref::<GatewayError>() {
        return gateway_err.reason();
    }
    match err.downcast_ref::<CloudError>() {
        Some(CloudError::Conflict { .. }) => REASON_CONFLICT,
        Some(CloudError::NotFound { .. }) => REASON_RESOURCE_NOT_FOUND,
        _ => REASON_CLOUD_API_ERROR,
    }
}

/// Turn a "not found" on a resource the controller only references into a
/// [`GatewayError::ReferencedResourceNotFound`]; other cloud errors pass through.
#[must_use]
pub fn referenced_not_found(err: CloudError, kind: &str, name: &str) -> anyhow::Error {
    if err.is_not_found() {
        GatewayError::ReferencedResourceNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

#[cfg(test)]
#[path = "gateway_errors_tests.rs"]
mod gateway_errors_tests;
