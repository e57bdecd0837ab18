// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public IP prefix lifecycle.
//!
//! Egress either leaves through a caller-supplied (BYO) prefix, a prefix the
//! controller creates and names after the `GatewayVMConfiguration` UID, or no
//! public prefix at all. Only the managed prefix is ever created or deleted.

use crate::azure::types::{IpVersion, PublicIpPrefix, PublicIpPrefixProperties, Sku};
use crate::azure::{ignore_not_found, CloudClient, ResourceId};
use crate::config::CloudConfig;
use crate::constants::{
    MANAGED_PUBLIC_IP_PREFIX_NAME_PREFIX, MAX_PUBLIC_IP_PREFIX_LENGTH, MIN_PUBLIC_IP_PREFIX_LENGTH,
    PUBLIC_IP_PREFIX_SKU_NAME, PUBLIC_IP_PREFIX_SKU_TIER,
};
use crate::gateway_errors::{referenced_not_found, GatewayError};
use anyhow::Result;
use tracing::{debug, info};

/// Prefix the gateway IP configurations allocate from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPrefix {
    /// ARM ID of the prefix, `None` when public IPs are disabled
    pub id: Option<String>,
    /// CIDR of the prefix, once allocated
    pub cidr: Option<String>,
    /// Whether the prefix is controller-managed
    pub is_managed: bool,
}

/// Name of the managed prefix of a `GatewayVMConfiguration`.
#[must_use]
pub fn managed_prefix_name(vm_config_uid: &str) -> String {
    format!("{MANAGED_PUBLIC_IP_PREFIX_NAME_PREFIX}-{vm_config_uid}")
}

/// Reject prefix lengths outside of [0, 31].
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrefixLength`].
pub fn validate_prefix_length(length: i32) -> Result<(), GatewayError> {
    if (MIN_PUBLIC_IP_PREFIX_LENGTH..=MAX_PUBLIC_IP_PREFIX_LENGTH).contains(&length) {
        Ok(())
    } else {
        Err(GatewayError::InvalidPrefixLength { length })
    }
}

/// Resolve the prefix for one reconcile pass, creating the managed prefix if needed.
///
/// With public IPs disabled nothing is looked up. A BYO prefix must live in the
/// controller's subscription, exist, and have the pool's prefix length.
///
/// # Errors
///
/// Configuration errors for bad BYO IDs and lengths,
/// [`GatewayError::ReferencedResourceNotFound`] for a missing BYO prefix, and
/// cloud errors for failed calls.
pub async fn resolve_public_ip_prefix(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    provision_public_ips: bool,
    byo_prefix_id: Option<&str>,
    vm_config_uid: &str,
    prefix_length: i32,
) -> Result<ResolvedPrefix> {
    if !provision_public_ips {
        return Ok(ResolvedPrefix::default());
    }
    validate_prefix_length(prefix_length)?;

    if let Some(id) = byo_prefix_id.filter(|id| !id.is_empty()) {
        let parsed = ResourceId::parse(id)?;
        if !parsed
            .subscription_id
            .eq_ignore_ascii_case(&config.subscription_id)
        {
            return Err(GatewayError::SubscriptionMismatch {
                id: id.to_string(),
                expected: config.subscription_id.clone(),
                found: parsed.subscription_id,
            }
            .into());
        }

        let prefix = cloud
            .get_public_ip_prefix(&parsed.resource_group, &parsed.name)
            .await
            .map_err(|e| referenced_not_found(e, "publicIPPrefix", id))?;
        if prefix.properties.prefix_length != Some(prefix_length) {
            return Err(GatewayError::PrefixLengthMismatch {
                id: id.to_string(),
                expected: prefix_length,
                found: prefix.properties.prefix_length,
            }
            .into());
        }

        debug!(prefix = %id, "Using caller-supplied public IP prefix");
        return Ok(ResolvedPrefix {
            id: Some(prefix.id.unwrap_or_else(|| id.to_string())),
            cidr: prefix.properties.ip_prefix,
            is_managed: false,
        });
    }

    let name = managed_prefix_name(vm_config_uid);
    let existing = ignore_not_found(
        cloud
            .get_public_ip_prefix(&config.resource_group, &name)
            .await,
    )?;
    let prefix = match existing {
        Some(prefix) => prefix,
        None => {
            info!(
                prefix = %name,
                resource_group = %config.resource_group,
                length = prefix_length,
                "Creating managed public IP prefix"
            );
            let desired = PublicIpPrefix {
                name: Some(name.clone()),
                location: Some(config.location.clone()),
                sku: Some(Sku {
                    name: Some(PUBLIC_IP_PREFIX_SKU_NAME.to_string()),
                    tier: Some(PUBLIC_IP_PREFIX_SKU_TIER.to_string()),
                }),
                properties: PublicIpPrefixProperties {
                    prefix_length: Some(prefix_length),
                    public_ip_address_version: Some(IpVersion::IPv4),
                    ..Default::default()
                },
                ..Default::default()
            };
            cloud
                .create_or_update_public_ip_prefix(&config.resource_group, &name, &desired)
                .await?
        }
    };

    Ok(ResolvedPrefix {
        id: prefix.id,
        cidr: prefix.properties.ip_prefix,
        is_managed: true,
    })
}

/// Delete the managed prefix of a `GatewayVMConfiguration`. Returns whether one existed.
///
/// # Errors
///
/// Any cloud error other than "not found".
pub async fn delete_managed_prefix(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    vm_config_uid: &str,
) -> Result<bool> {
    let name = managed_prefix_name(vm_config_uid);
    let deleted = ignore_not_found(
        cloud
            .delete_public_ip_prefix(&config.resource_group, &name)
            .await,
    )?
    .is_some();
    if deleted {
        info!(prefix = %name, "Deleted managed public IP prefix");
    }
    Ok(deleted)
}

#[cfg(test)]
#[path = "prefix_tests.rs"]
mod prefix_tests;
