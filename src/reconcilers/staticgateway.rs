// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `StaticGatewayConfiguration` reconciliation.
//!
//! The top-level object owns a `GatewayLBConfiguration` of the same name and
//! mirrors its status. It carries no finalizer; deleting it cascades to the
//! children through their owner references.

use super::children::{apply_child, owner_reference};
use super::gatewayvm::agentpool::validate_pool_selector;
use super::status::{conditions_equal, patch_status, set_ready_condition};
use super::ReconcileOutcome;
use crate::context::Context;
use crate::crd::{
    GatewayLBConfiguration, GatewayLBConfigurationSpec, GatewayLBConfigurationStatus,
    GatewayServerProfile, StaticGatewayConfiguration,
};
use crate::labels::MANAGED_BY_STATIC_GATEWAY_CONFIGURATION;
use crate::status_reasons::{REASON_PROGRESSING, REASON_READY};
use anyhow::Result;
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// What the top-level status should say, derived from the LB-level status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayView {
    /// Frontend IP and port, once both are known
    pub server_profile: Option<GatewayServerProfile>,
    /// Egress address space
    pub egress_ip_prefix: Option<String>,
}

impl GatewayView {
    /// Whether the gateway is fully provisioned.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.server_profile.is_some() && self.egress_ip_prefix.is_some()
    }
}

/// Mirror the LB-level status.
#[must_use]
pub fn gateway_view(lb_status: Option<&GatewayLBConfigurationStatus>) -> GatewayView {
    let Some(status) = lb_status else {
        return GatewayView::default();
    };
    let server_profile = match (&status.frontend_ip, status.server_port) {
        (Some(ip), Some(port)) => Some(GatewayServerProfile {
            ip: Some(ip.clone()),
            port: Some(port),
        }),
        _ => None,
    };
    GatewayView {
        server_profile,
        egress_ip_prefix: status.egress_ip_prefix.clone(),
    }
}

/// Reconciles a `StaticGatewayConfiguration` resource.
///
/// # Errors
///
/// Returns an error for an invalid pool selector or a failed Kubernetes API call.
pub async fn reconcile_static_gateway_configuration(
    ctx: Arc<Context>,
    gateway: StaticGatewayConfiguration,
) -> Result<ReconcileOutcome> {
    let namespace = gateway.namespace().unwrap_or_default();
    let name = gateway.name_any();

    if gateway.metadata.deletion_timestamp.is_some() {
        debug!("StaticGatewayConfiguration {}/{} is being deleted", namespace, name);
        return Ok(ReconcileOutcome::Removed);
    }

    info!("Reconciling StaticGatewayConfiguration: {}/{}", namespace, name);
    validate_pool_selector(&gateway.spec.pool)?;

    let lb_config: GatewayLBConfiguration = apply_child(
        &ctx.client,
        &namespace,
        &name,
        &GatewayLBConfigurationSpec::from(&gateway.spec),
        owner_reference(&gateway)?,
        MANAGED_BY_STATIC_GATEWAY_CONFIGURATION,
    )
    .await?;

    let view = gateway_view(lb_config.status.as_ref());
    let current = gateway.status.clone().unwrap_or_default();
    let mut conditions = current.conditions.clone();
    if view.is_ready() {
        set_ready_condition(&mut conditions, true, REASON_READY, "Gateway is provisioned");
    } else {
        set_ready_condition(
            &mut conditions,
            false,
            REASON_PROGRESSING,
            "Waiting for load balancer and gateway nodes",
        );
    }

    let generation = gateway.metadata.generation;
    let unchanged = current.gateway_server_profile == view.server_profile
        && current.egress_ip_prefix == view.egress_ip_prefix
        && current.observed_generation == generation
        && conditions_equal(&current.conditions, &conditions);
    if unchanged {
        debug!("StaticGatewayConfiguration {}/{} status unchanged", namespace, name);
    } else {
        let status = json!({
            "conditions": conditions,
            "observedGeneration": generation,
            "gatewayServerProfile": view.server_profile,
            "egressIpPrefix": view.egress_ip_prefix,
        });
        patch_status(&ctx.client, &gateway, &status).await?;
    }

    Ok(if view.is_ready() {
        ReconcileOutcome::Ready
    } else {
        ReconcileOutcome::Progressing
    })
}

#[cfg(test)]
#[path = "staticgateway_tests.rs"]
mod staticgateway_tests;
