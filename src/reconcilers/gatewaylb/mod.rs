// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `GatewayLBConfiguration` reconciliation.
//!
//! The LB-level object owns the gateway's rule and probe on the shared load
//! balancer and the `GatewayVMConfiguration` of the same name. On deletion the
//! VM-level object is removed first; the load balancer is only touched once it
//! is gone.

pub mod convergence;
pub mod ports;

use self::convergence::{converge_load_balancer, LbConvergence};
use super::children::{apply_child, delete_child, get_child, owner_reference};
use super::finalizers::{ensure_finalizer, handle_deletion, FinalizerCleanup};
use super::gatewayvm::agentpool::AgentPool;
use super::lifecycle::{phase_of, LifecyclePhase};
use super::status::{conditions_equal, patch_status, set_ready_condition};
use super::ReconcileOutcome;
use crate::azure::{ignore_not_found, CloudClient};
use crate::config::CloudConfig;
use crate::context::Context;
use crate::crd::{
    GatewayLBConfiguration, GatewayLBConfigurationSpec, GatewayVMConfiguration,
    GatewayVMConfigurationSpec,
};
use crate::gateway_errors::GatewayError;
use crate::labels::{FINALIZER_LB_CONFIGURATION, MANAGED_BY_GATEWAY_LB_CONFIGURATION};
use crate::status_reasons::{REASON_DELETING, REASON_PROGRESSING, REASON_READY};
use anyhow::{anyhow, Result};
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pool identity to clean up with.
///
/// Resolved from the spec when the pool still exists. Otherwise it is read
/// back from the frontend the owner's rule points at; with no rule left an
/// empty ID is returned, which matches no frontend.
///
/// # Errors
///
/// Fails on cloud errors other than the pool being gone.
pub async fn cleanup_pool_id(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    spec: &GatewayLBConfigurationSpec,
    owner_uid: &str,
) -> Result<String> {
    let err = match AgentPool::resolve(cloud, config, &spec.pool).await {
        Ok(pool) => return Ok(pool.unique_id()?),
        Err(err) => err,
    };
    let pool_gone = matches!(
        err.downcast_ref::<GatewayError>(),
        Some(
            GatewayError::PoolNotFound { .. }
                | GatewayError::ReferencedResourceNotFound { .. }
                | GatewayError::InvalidPoolSelector { .. }
        )
    );
    if !pool_gone {
        return Err(err);
    }

    warn!(error = %err, "Gateway pool is gone, locating frontend from the load balancer rule");
    let lb = ignore_not_found(
        cloud
            .get_load_balancer(&config.resource_group, &config.load_balancer_name)
            .await,
    )?;
    let pool_id = lb
        .iter()
        .flat_map(|lb| lb.properties.load_balancing_rules.iter())
        .find(|rule| rule.name.eq_ignore_ascii_case(owner_uid))
        .and_then(|rule| rule.properties.frontend_ip_configuration.as_ref())
        .and_then(|frontend| frontend.id.rsplit('/').next())
        .unwrap_or_default()
        .to_string();
    Ok(pool_id)
}

/// Converge the load balancer for a live `GatewayLBConfiguration`.
///
/// # Errors
///
/// Fails on configuration errors, malformed cloud state, and failed cloud calls.
pub async fn converge_gateway_lb(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    spec: &GatewayLBConfigurationSpec,
    owner_uid: &str,
) -> Result<LbConvergence> {
    let pool = AgentPool::resolve(cloud, config, &spec.pool).await?;
    let unique_id = pool.unique_id()?;
    debug!(pool = %pool.describe(), unique_id = %unique_id, "Resolved gateway pool");
    converge_load_balancer(cloud, config, &unique_id, owner_uid, true).await
}

/// Retract the gateway's rule and probe, and the pool's frontend once unused.
///
/// # Errors
///
/// Fails on failed cloud calls.
pub async fn retract_gateway_lb(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    spec: &GatewayLBConfigurationSpec,
    owner_uid: &str,
) -> Result<()> {
    let pool_id = cleanup_pool_id(cloud, config, spec, owner_uid).await?;
    converge_load_balancer(cloud, config, &pool_id, owner_uid, false).await?;
    Ok(())
}

fn require_uid(lb_config: &GatewayLBConfiguration) -> Result<String> {
    lb_config.uid().ok_or_else(|| {
        anyhow!(
            "GatewayLBConfiguration {}/{} has no uid",
            lb_config.namespace().unwrap_or_default(),
            lb_config.name_any()
        )
    })
}

#[async_trait::async_trait]
impl FinalizerCleanup for GatewayLBConfiguration {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        info!(
            "Retracting load balancer rule for {}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        );
        retract_gateway_lb(ctx.cloud.as_ref(), &ctx.config, &self.spec, &require_uid(self)?).await
    }
}

/// Reconciles a `GatewayLBConfiguration` resource.
///
/// While live: adds the finalizer, converges the load balancer, applies the
/// owned `GatewayVMConfiguration`, and reports frontend IP, port and egress
/// prefix. While deleting: deletes the `GatewayVMConfiguration` and waits for
/// it to disappear, then retracts the load balancer objects and releases the
/// finalizer.
///
/// # Errors
///
/// Returns an error if Kubernetes API or cloud operations fail.
pub async fn reconcile_gateway_lb_configuration(
    ctx: Arc<Context>,
    lb_config: GatewayLBConfiguration,
) -> Result<ReconcileOutcome> {
    let namespace = lb_config.namespace().unwrap_or_default();
    let name = lb_config.name_any();

    let child: Option<GatewayVMConfiguration> = get_child(&ctx.client, &namespace, &name).await?;

    match phase_of(&lb_config, FINALIZER_LB_CONFIGURATION, child.is_some()) {
        LifecyclePhase::Removed => return Ok(ReconcileOutcome::Removed),
        LifecyclePhase::ChildrenPending => {
            if let Some(child) = &child {
                delete_child(&ctx.client, child).await?;
            }
            info!(
                "Waiting for GatewayVMConfiguration {}/{} to be deleted",
                namespace, name
            );
            let current = lb_config
                .status
                .as_ref()
                .map(|s| s.conditions.clone())
                .unwrap_or_default();
            let mut conditions = current.clone();
            set_ready_condition(
                &mut conditions,
                false,
                REASON_DELETING,
                "Waiting for GatewayVMConfiguration to be deleted",
            );
            if !conditions_equal(&current, &conditions) {
                patch_status(&ctx.client, &lb_config, &json!({ "conditions": conditions })).await?;
            }
            return Ok(ReconcileOutcome::Progressing);
        }
        LifecyclePhase::SelfCleanup => {
            handle_deletion(&ctx, &lb_config, FINALIZER_LB_CONFIGURATION).await?;
            return Ok(ReconcileOutcome::Removed);
        }
        LifecyclePhase::Active => {}
    }

    info!("Reconciling GatewayLBConfiguration: {}/{}", namespace, name);
    ensure_finalizer(&ctx.client, &lb_config, FINALIZER_LB_CONFIGURATION).await?;

    let converged = converge_gateway_lb(
        ctx.cloud.as_ref(),
        &ctx.config,
        &lb_config.spec,
        &require_uid(&lb_config)?,
    )
    .await?;

    let vm_config: GatewayVMConfiguration = apply_child(
        &ctx.client,
        &namespace,
        &name,
        &GatewayVMConfigurationSpec::from(&lb_config.spec),
        owner_reference(&lb_config)?,
        MANAGED_BY_GATEWAY_LB_CONFIGURATION,
    )
    .await?;
    let egress_ip_prefix = vm_config.status.and_then(|s| s.egress_ip_prefix);

    let ready = converged.frontend_ip.is_some()
        && converged.port.is_some()
        && egress_ip_prefix.is_some();
    let current = lb_config.status.clone().unwrap_or_default();
    let mut conditions = current.conditions.clone();
    if ready {
        set_ready_condition(
            &mut conditions,
            true,
            REASON_READY,
            &format!(
                "Load balancer rule serving on {}:{}",
                converged.frontend_ip.as_deref().unwrap_or_default(),
                converged.port.unwrap_or_default()
            ),
        );
    } else {
        set_ready_condition(
            &mut conditions,
            false,
            REASON_PROGRESSING,
            "Waiting for frontend IP and gateway VM configuration",
        );
    }

    let unchanged = current.frontend_ip == converged.frontend_ip
        && current.server_port == converged.port
        && current.egress_ip_prefix == egress_ip_prefix
        && conditions_equal(&current.conditions, &conditions);
    if unchanged {
        debug!("GatewayLBConfiguration {}/{} status unchanged", namespace, name);
    } else {
        let status = json!({
            "conditions": conditions,
            "frontendIp": converged.frontend_ip,
            "serverPort": converged.port,
            "egressIpPrefix": egress_ip_prefix,
        });
        patch_status(&ctx.client, &lb_config, &status).await?;
    }

    Ok(if ready {
        ReconcileOutcome::Ready
    } else {
        ReconcileOutcome::Progressing
    })
}
