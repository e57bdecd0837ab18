// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared load balancer convergence.
//!
//! One regional load balancer carries every gateway in the cluster:
//!
//! - one frontend + backend pool per agent pool, both named after the pool's unique ID
//! - one rule + probe per `GatewayLBConfiguration`, both named after its UID
//!
//! A pass reads the load balancer once, edits the in-memory copy and writes it
//! back at most once, sending the etag from the read as `If-Match`. A concurrent
//! writer makes the write fail with [`CloudError::Conflict`](crate::azure::CloudError::Conflict); the reconcile is
//! then retried from a fresh read.

use super::ports::allocate_port;
use crate::azure::resource_id::{load_balancer_id, subnet_id};
use crate::azure::types::{
    ids_equal, optional_ids_equal, BackendAddressPool, FrontendIpConfiguration,
    FrontendIpConfigurationProperties, IpAllocationMethod, IpVersion, LoadBalancer,
    LoadBalancingRule, LoadBalancingRuleProperties, Probe, ProbeProperties, ProbeProtocol, Sku,
    SubResource, TransportProtocol,
};
use crate::azure::{ignore_not_found, CloudClient};
use crate::config::CloudConfig;
use crate::constants::{GATEWAY_HEALTH_PROBE_PATH_PREFIX, LB_SKU_STANDARD};
use crate::gateway_errors::{referenced_not_found, GatewayError};
use crate::metrics;
use anyhow::Result;
use tracing::{debug, info};

/// Outcome of a convergence pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LbConvergence {
    /// Private IP of the pool's frontend, once allocated
    pub frontend_ip: Option<String>,
    /// Port of the owner's rule
    pub port: Option<i32>,
}

/// Deterministic references to the objects a gateway owns on the load balancer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LbNames {
    pub frontend_name: String,
    pub backend_name: String,
    pub rule_name: String,
    pub probe_name: String,
    pub frontend_id: String,
    pub backend_id: String,
    pub probe_id: String,
}

impl LbNames {
    pub(crate) fn new(config: &CloudConfig, pool_unique_id: &str, owner_uid: &str) -> Self {
        let lb_id = load_balancer_id(
            &config.subscription_id,
            &config.resource_group,
            &config.load_balancer_name,
        );
        Self {
            frontend_name: pool_unique_id.to_string(),
            backend_name: pool_unique_id.to_string(),
            rule_name: owner_uid.to_string(),
            probe_name: owner_uid.to_string(),
            frontend_id: lb_id.child("frontendIPConfigurations", pool_unique_id),
            backend_id: lb_id.child("backendAddressPools", pool_unique_id),
            probe_id: lb_id.child("probes", owner_uid),
        }
    }
}

/// Health probe request path of a gateway.
#[must_use]
pub fn health_probe_path(owner_uid: &str) -> String {
    format!("{GATEWAY_HEALTH_PROBE_PATH_PREFIX}{owner_uid}")
}

/// Whether an existing rule forwards to the expected frontend, backend and probe.
pub(crate) fn rule_matches(rule: &LoadBalancingRule, names: &LbNames) -> bool {
    let props = &rule.properties;
    let ports_valid = matches!(
        (props.frontend_port, props.backend_port),
        (Some(f), Some(b)) if f == b
    );

    ports_valid
        && props.protocol == Some(TransportProtocol::Udp)
        && props.enable_floating_ip == Some(true)
        && optional_ids_equal(
            props.frontend_ip_configuration.as_ref().map(|r| r.id.as_str()),
            Some(names.frontend_id.as_str()),
        )
        && optional_ids_equal(
            props.backend_address_pool.as_ref().map(|r| r.id.as_str()),
            Some(names.backend_id.as_str()),
        )
        && optional_ids_equal(
            props.probe.as_ref().map(|r| r.id.as_str()),
            Some(names.probe_id.as_str()),
        )
}

fn build_rule(names: &LbNames, port: i32) -> LoadBalancingRule {
    LoadBalancingRule {
        id: None,
        name: names.rule_name.clone(),
        properties: LoadBalancingRuleProperties {
            protocol: Some(TransportProtocol::Udp),
            enable_floating_ip: Some(true),
            frontend_ip_configuration: Some(SubResource::new(&names.frontend_id)),
            backend_address_pool: Some(SubResource::new(&names.backend_id)),
            probe: Some(SubResource::new(&names.probe_id)),
            frontend_port: Some(port),
            backend_port: Some(port),
            ..Default::default()
        },
    }
}

fn build_probe(names: &LbNames, owner_uid: &str, probe_port: i32) -> Probe {
    Probe {
        id: None,
        name: names.probe_name.clone(),
        properties: ProbeProperties {
            protocol: Some(ProbeProtocol::Http),
            port: Some(probe_port),
            request_path: Some(health_probe_path(owner_uid)),
            ..Default::default()
        },
    }
}

/// Whether an existing probe has the expected path, protocol and port.
pub(crate) fn probe_matches(probe: &Probe, expected: &Probe) -> bool {
    probe.properties.protocol == expected.properties.protocol
        && probe.properties.port == expected.properties.port
        && probe.properties.request_path == expected.properties.request_path
}

/// Read the private IPv4 address of an existing frontend.
fn frontend_address(frontend: &FrontendIpConfiguration) -> Result<String, GatewayError> {
    let malformed = |reason: &str| GatewayError::MalformedFrontend {
        name: frontend.name.clone(),
        reason: reason.to_string(),
    };
    if frontend.properties.private_ip_address_version != Some(IpVersion::IPv4) {
        return Err(malformed("private IP address version is not IPv4"));
    }
    frontend
        .properties
        .private_ip_address
        .clone()
        .ok_or_else(|| malformed("no private IP address"))
}

/// Converge the shared load balancer for one gateway.
///
/// With `need_lb`, ensures the pool's frontend/backend and the owner's rule/probe
/// exist and match, allocating a port for a new rule. Without it, removes the
/// owner's rule/probe, then the pool's frontend/backend once no other rule uses
/// them, then the load balancer itself once it has no frontend left.
///
/// # Errors
///
/// Returns [`GatewayError`]s for malformed frontends and port problems, and
/// [`CloudError`](crate::azure::CloudError)s for failed cloud calls, including `Conflict` when the load
/// balancer changed since it was read.
pub async fn converge_load_balancer(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    pool_unique_id: &str,
    owner_uid: &str,
    need_lb: bool,
) -> Result<LbConvergence> {
    let resource_group = config.resource_group.as_str();
    let lb_name = config.load_balancer_name.as_str();
    let names = LbNames::new(config, pool_unique_id, owner_uid);

    let existing = ignore_not_found(cloud.get_load_balancer(resource_group, lb_name).await)?;
    let mut lb = match existing {
        Some(lb) => lb,
        None if !need_lb => {
            debug!(load_balancer = lb_name, "Load balancer absent, nothing to clean up");
            return Ok(LbConvergence::default());
        }
        None => {
            info!(load_balancer = lb_name, "Load balancer absent, creating it");
            LoadBalancer {
                name: Some(lb_name.to_string()),
                location: Some(config.location.clone()),
                sku: Some(Sku {
                    name: Some(LB_SKU_STANDARD.to_string()),
                    tier: None,
                }),
                ..Default::default()
            }
        }
    };
    let etag = lb.etag.clone();
    let props = &mut lb.properties;
    let mut changed = false;
    let mut frontend_created = false;
    let mut frontend_ip = None;

    // Frontend
    let frontend = props
        .frontend_ip_configurations
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(&names.frontend_name));
    match frontend {
        Some(frontend) if need_lb => frontend_ip = Some(frontend_address(frontend)?),
        Some(_) => {}
        None if need_lb => {
            let subnet = cloud
                .get_subnet(&config.vnet_resource_group, &config.vnet_name, &config.subnet_name)
                .await
                .map_err(|e| referenced_not_found(e, "subnet", &config.subnet_name))?;
            let subnet_ref = subnet.id.unwrap_or_else(|| {
                subnet_id(
                    &config.subscription_id,
                    &config.vnet_resource_group,
                    &config.vnet_name,
                    &config.subnet_name,
                )
            });
            info!(frontend = %names.frontend_name, "Adding load balancer frontend");
            props.frontend_ip_configurations.push(FrontendIpConfiguration {
                id: None,
                name: names.frontend_name.clone(),
                properties: FrontendIpConfigurationProperties {
                    private_ip_address: None,
                    private_ip_address_version: Some(IpVersion::IPv4),
                    private_ip_allocation_method: Some(IpAllocationMethod::Dynamic),
                    subnet: Some(SubResource::new(subnet_ref)),
                    ..Default::default()
                },
            });
            changed = true;
            frontend_created = true;
        }
        None => {}
    }

    // Backend pool
    let has_backend = props
        .backend_address_pools
        .iter()
        .any(|p| p.name.eq_ignore_ascii_case(&names.backend_name));
    if !has_backend && need_lb {
        info!(backend = %names.backend_name, "Adding load balancer backend pool");
        props.backend_address_pools.push(BackendAddressPool {
            id: None,
            name: names.backend_name.clone(),
        });
        changed = true;
    }

    // Rule
    let mut port = None;
    let mut remove_pool = false;
    let rule_index = props
        .load_balancing_rules
        .iter()
        .position(|r| r.name.eq_ignore_ascii_case(&names.rule_name));
    if need_lb {
        if let Some(index) = rule_index {
            if rule_matches(&props.load_balancing_rules[index], &names) {
                port = props.load_balancing_rules[index].properties.frontend_port;
            } else {
                info!(rule = %names.rule_name, "Load balancing rule drifted, replacing it");
                props.load_balancing_rules.remove(index);
                changed = true;
            }
        }
        if port.is_none() {
            let allocated = allocate_port(&props.load_balancing_rules, &names.backend_id)?;
            info!(rule = %names.rule_name, port = allocated, "Adding load balancing rule");
            props.load_balancing_rules.push(build_rule(&names, allocated));
            metrics::record_port_allocated();
            port = Some(allocated);
            changed = true;
        }
    } else {
        if let Some(index) = rule_index {
            info!(rule = %names.rule_name, "Removing load balancing rule");
            props.load_balancing_rules.remove(index);
            changed = true;
        }
        let rule_ref_count = props
            .load_balancing_rules
            .iter()
            .filter(|r| {
                r.properties
                    .frontend_ip_configuration
                    .as_ref()
                    .is_some_and(|f| ids_equal(&f.id, &names.frontend_id))
            })
            .count();
        debug!(frontend = %names.frontend_name, rule_ref_count, "Counted rules on frontend");
        remove_pool = rule_ref_count == 0;
    }

    // Probe
    let expected_probe = build_probe(&names, owner_uid, config.health_probe_port);
    let probe_index = props
        .probes
        .iter()
        .position(|p| p.name.eq_ignore_ascii_case(&names.probe_name));
    let mut probe_ok = false;
    if let Some(index) = probe_index {
        if need_lb && probe_matches(&props.probes[index], &expected_probe) {
            probe_ok = true;
        } else {
            info!(probe = %names.probe_name, "Removing health probe");
            props.probes.remove(index);
            changed = true;
        }
    }
    if need_lb && !probe_ok {
        info!(probe = %names.probe_name, "Adding health probe");
        props.probes.push(expected_probe);
        changed = true;
    }

    // Frontend and backend, once unreferenced
    if remove_pool {
        let before = props.frontend_ip_configurations.len() + props.backend_address_pools.len();
        props
            .frontend_ip_configurations
            .retain(|f| !f.name.eq_ignore_ascii_case(&names.frontend_name));
        props
            .backend_address_pools
            .retain(|p| !p.name.eq_ignore_ascii_case(&names.backend_name));
        let removed = before
            != props.frontend_ip_configurations.len() + props.backend_address_pools.len();
        if removed {
            info!(frontend = %names.frontend_name, "Removing unreferenced frontend and backend pool");
            changed = true;
        }

        if removed && props.frontend_ip_configurations.is_empty() {
            info!(load_balancer = lb_name, "Load balancer has no frontend left, deleting it");
            cloud
                .delete_load_balancer(resource_group, lb_name, etag.as_deref())
                .await?;
            return Ok(LbConvergence::default());
        }
    }

    if !changed {
        debug!(load_balancer = lb_name, "Load balancer already converged");
        return Ok(LbConvergence { frontend_ip, port });
    }

    let updated = cloud
        .create_or_update_load_balancer(resource_group, lb_name, &lb, etag.as_deref())
        .await?;

    if need_lb && frontend_created {
        frontend_ip = updated
            .properties
            .frontend_ip_configurations
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(&names.frontend_name))
            .and_then(|f| f.properties.private_ip_address.clone());
        if frontend_ip.is_none() {
            debug!(frontend = %names.frontend_name, "Frontend IP not allocated yet");
        }
    }

    Ok(LbConvergence {
        frontend_ip: if need_lb { frontend_ip } else { None },
        port: if need_lb { port } else { None },
    })
}

#[cfg(test)]
#[path = "convergence_tests.rs"]
mod convergence_tests;
