// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ARM resource ID parsing and construction.
//!
//! IDs look like
//! `/subscriptions/<sub>/resourceGroups/<rg>/providers/<namespace>/<type>/<name>[/<child-type>/<child-name>]`.
//! Segment keys are matched case-insensitively since ARM itself treats them so.

use crate::gateway_errors::GatewayError;
use std::fmt;

/// A parsed ARM resource ID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    /// Parse an ARM resource ID.
    ///
    /// For nested resources, `resource_type`/`name` describe the outermost
    /// resource after the provider namespace.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResourceId`] when the subscription,
    /// resource group, provider or resource name segment is missing.
    pub fn parse(id: &str) -> Result<Self, GatewayError> {
        let invalid = |reason: &str| GatewayError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = id.trim_matches('/').split('/').collect();
        if segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("expected key/value segment pairs"));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider_at = None;
        for (i, pair) in segments.chunks(2).enumerate() {
            let key = pair[0];
            if key.eq_ignore_ascii_case("subscriptions") && subscription_id.is_none() {
                subscription_id = Some(pair[1]);
            } else if key.eq_ignore_ascii_case("resourceGroups") && resource_group.is_none() {
                resource_group = Some(pair[1]);
            } else if key.eq_ignore_ascii_case("providers") {
                provider_at = Some(i * 2);
                break;
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| invalid("missing subscriptions segment"))?;
        let resource_group = resource_group.ok_or_else(|| invalid("missing resourceGroups segment"))?;
        let provider_at = provider_at.ok_or_else(|| invalid("missing providers segment"))?;

        // providers/<namespace>/<type>/<name>
        let rest = &segments[provider_at + 1..];
        if rest.len() < 3 {
            return Err(invalid("missing resource type or name"));
        }

        Ok(Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: rest[0].to_string(),
            resource_type: rest[1].to_string(),
            name: rest[2].to_string(),
        })
    }

    /// Build an ID for a top-level resource.
    #[must_use]
    pub fn new(
        subscription_id: &str,
        resource_group: &str,
        provider: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            provider: provider.to_string(),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        }
    }

    /// ID of a child resource, e.g. a load balancer's frontend.
    #[must_use]
    pub fn child(&self, child_type: &str, child_name: &str) -> String {
        format!("{self}/{child_type}/{child_name}")
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id, self.resource_group, self.provider, self.resource_type, self.name
        )
    }
}

/// ID of a load balancer.
#[must_use]
pub fn load_balancer_id(subscription_id: &str, resource_group: &str, name: &str) -> ResourceId {
    ResourceId::new(
        subscription_id,
        resource_group,
        "Microsoft.Network",
        "loadBalancers",
        name,
    )
}

/// ID of a subnet.
#[must_use]
pub fn subnet_id(subscription_id: &str, resource_group: &str, vnet: &str, subnet: &str) -> String {
    ResourceId::new(
        subscription_id,
        resource_group,
        "Microsoft.Network",
        "virtualNetworks",
        vnet,
    )
    .child("subnets", subnet)
}

/// ID of a public IP prefix.
#[must_use]
pub fn public_ip_prefix_id(subscription_id: &str, resource_group: &str, name: &str) -> String {
    ResourceId::new(
        subscription_id,
        resource_group,
        "Microsoft.Network",
        "publicIPPrefixes",
        name,
    )
    .to_string()
}

#[cfg(test)]
#[path = "resource_id_tests.rs"]
mod resource_id_tests;
