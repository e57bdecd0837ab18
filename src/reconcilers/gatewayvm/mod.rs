// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `GatewayVMConfiguration` reconciliation.
//!
//! The VM-level object owns the gateway IP configuration on every NIC of its
//! node pool and, when public IPs are provisioned without a caller-supplied
//! prefix, a managed public IP prefix.
//!
//! ## Modules
//!
//! - [`agentpool`] - Scale set and VM pool resolution and member iteration
//! - [`nic`] - Gateway IP configuration diffing on a single NIC
//! - [`prefix`] - Managed and caller-supplied public IP prefix handling

pub mod agentpool;
pub mod nic;
pub mod prefix;

use self::agentpool::AgentPool;
use self::nic::{gateway_ip_config_name, NicTarget};
use self::prefix::{delete_managed_prefix, resolve_public_ip_prefix, ResolvedPrefix};
use super::finalizers::{ensure_finalizer, handle_deletion, FinalizerCleanup};
use super::lifecycle::{phase_of, LifecyclePhase};
use super::status::{conditions_equal, patch_status, set_ready_condition};
use super::ReconcileOutcome;
use crate::azure::CloudClient;
use crate::config::CloudConfig;
use crate::context::Context;
use crate::crd::{GatewayVMConfiguration, GatewayVMConfigurationSpec, GatewayVmProfileStatus};
use crate::gateway_errors::GatewayError;
use crate::labels::FINALIZER_VM_CONFIGURATION;
use crate::status_reasons::REASON_READY;
use anyhow::{anyhow, Result};
use kube::ResourceExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of converging one `GatewayVMConfiguration`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmConvergence {
    /// One profile per gateway node, sorted by node name
    pub profiles: Vec<GatewayVmProfileStatus>,
    /// Prefix CIDR, or the comma-joined gateway private IPs
    pub egress_ip_prefix: Option<String>,
}

/// The egress address space reported in status.
///
/// A public prefix reports its CIDR. Without one, the secondary private IPs of
/// the nodes are joined with commas in node name order.
#[must_use]
pub fn egress_ip_prefix(prefix: &ResolvedPrefix, profiles: &[GatewayVmProfileStatus]) -> Option<String> {
    if prefix.id.is_some() {
        return prefix.cidr.clone();
    }
    let ips: Vec<&str> = profiles
        .iter()
        .filter_map(|p| p.secondary_ip.as_deref())
        .collect();
    if ips.is_empty() {
        None
    } else {
        Some(ips.join(","))
    }
}

/// Put the gateway IP configuration on every pool NIC.
///
/// Resolves the pool and the public IP prefix, converges every member, and
/// deletes a managed prefix left over from an earlier spec once no NIC
/// allocates from it anymore.
///
/// # Errors
///
/// Fails on configuration errors, malformed cloud state, and failed cloud calls.
pub async fn converge_gateway_vm(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    spec: &GatewayVMConfigurationSpec,
    namespace: &str,
    name: &str,
    uid: &str,
) -> Result<VmConvergence> {
    let pool = AgentPool::resolve(cloud, config, &spec.pool).await?;
    let backend_pool_id = pool.backend_pool_id(config)?;

    let prefix = resolve_public_ip_prefix(
        cloud,
        config,
        spec.provision_public_ips,
        spec.public_ip_prefix_id.as_deref(),
        uid,
        pool.prefix_length(),
    )
    .await?;

    let ip_config_name = gateway_ip_config_name(namespace, name);
    let target = NicTarget {
        ip_config_name: &ip_config_name,
        want_ip_config: true,
        public_ip_prefix_id: prefix.id.as_deref(),
        backend_pool_id: &backend_pool_id,
    };
    let profiles = pool.reconcile(cloud, &target).await?;

    if !prefix.is_managed {
        delete_managed_prefix(cloud, config, uid).await?;
    }

    let egress_ip_prefix = egress_ip_prefix(&prefix, &profiles);
    debug!(
        pool = %pool.describe(),
        nodes = profiles.len(),
        egress = ?egress_ip_prefix,
        "Converged gateway VM configuration"
    );
    Ok(VmConvergence {
        profiles,
        egress_ip_prefix,
    })
}

fn is_pool_gone(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<GatewayError>(),
        Some(
            GatewayError::PoolNotFound { .. }
                | GatewayError::ReferencedResourceNotFound { .. }
                | GatewayError::InvalidPoolSelector { .. }
        )
    )
}

/// Remove the gateway IP configuration from every pool NIC and delete the managed prefix.
///
/// A pool that no longer exists, or never resolved, has nothing to retract;
/// the managed prefix is still deleted.
///
/// # Errors
///
/// Fails on malformed cloud state and failed cloud calls.
pub async fn retract_gateway_vm(
    cloud: &dyn CloudClient,
    config: &CloudConfig,
    spec: &GatewayVMConfigurationSpec,
    namespace: &str,
    name: &str,
    uid: &str,
) -> Result<()> {
    match AgentPool::resolve(cloud, config, &spec.pool).await {
        Ok(pool) => {
            let backend_pool_id = pool.backend_pool_id(config)?;
            let ip_config_name = gateway_ip_config_name(namespace, name);
            let target = NicTarget {
                ip_config_name: &ip_config_name,
                want_ip_config: false,
                public_ip_prefix_id: None,
                backend_pool_id: &backend_pool_id,
            };
            pool.reconcile(cloud, &target).await?;
        }
        Err(err) if is_pool_gone(&err) => {
            warn!(namespace, name, error = %err, "Gateway pool is gone, skipping NIC cleanup");
        }
        Err(err) => return Err(err),
    }

    delete_managed_prefix(cloud, config, uid).await?;
    Ok(())
}

fn require_uid(vm_config: &GatewayVMConfiguration) -> Result<String> {
    vm_config.uid().ok_or_else(|| {
        anyhow!(
            "GatewayVMConfiguration {}/{} has no uid",
            vm_config.namespace().unwrap_or_default(),
            vm_config.name_any()
        )
    })
}

#[async_trait::async_trait]
impl FinalizerCleanup for GatewayVMConfiguration {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let namespace = self.namespace().unwrap_or_default();
        let name = self.name_any();
        info!("Retracting gateway IP configuration for {}/{}", namespace, name);

        retract_gateway_vm(
            ctx.cloud.as_ref(),
            &ctx.config,
            &self.spec,
            &namespace,
            &name,
            &require_uid(self)?,
        )
        .await
    }
}

/// Reconciles a `GatewayVMConfiguration` resource.
///
/// While the resource is live the finalizer is added, every pool NIC gets the
/// gateway IP configuration, and the per-node profiles and egress prefix are
/// written to status. Once deleted, the NICs are cleaned up and the managed
/// prefix is removed before the finalizer is released.
///
/// # Errors
///
/// Returns an error if Kubernetes API or cloud operations fail.
pub async fn reconcile_gateway_vm_configuration(
    ctx: Arc<Context>,
    vm_config: GatewayVMConfiguration,
) -> Result<ReconcileOutcome> {
    let namespace = vm_config.namespace().unwrap_or_default();
    let name = vm_config.name_any();

    match phase_of(&vm_config, FINALIZER_VM_CONFIGURATION, false) {
        LifecyclePhase::Removed => return Ok(ReconcileOutcome::Removed),
        LifecyclePhase::ChildrenPending | LifecyclePhase::SelfCleanup => {
            handle_deletion(&ctx, &vm_config, FINALIZER_VM_CONFIGURATION).await?;
            return Ok(ReconcileOutcome::Removed);
        }
        LifecyclePhase::Active => {}
    }

    info!("Reconciling GatewayVMConfiguration: {}/{}", namespace, name);
    ensure_finalizer(&ctx.client, &vm_config, FINALIZER_VM_CONFIGURATION).await?;

    let converged = converge_gateway_vm(
        ctx.cloud.as_ref(),
        &ctx.config,
        &vm_config.spec,
        &namespace,
        &name,
        &require_uid(&vm_config)?,
    )
    .await?;

    let current = vm_config.status.clone().unwrap_or_default();
    let mut conditions = current.conditions.clone();
    set_ready_condition(
        &mut conditions,
        true,
        REASON_READY,
        &format!(
            "Gateway IP configuration present on {} node(s)",
            converged.profiles.len()
        ),
    );

    let unchanged = current.gateway_vm_profiles == converged.profiles
        && current.egress_ip_prefix == converged.egress_ip_prefix
        && conditions_equal(&current.conditions, &conditions);
    if unchanged {
        debug!("GatewayVMConfiguration {}/{} status unchanged", namespace, name);
    } else {
        let status = json!({
            "conditions": conditions,
            "gatewayVmProfiles": converged.profiles,
            "egressIpPrefix": converged.egress_ip_prefix,
        });
        patch_status(&ctx.client, &vm_config, &status).await?;
    }

    Ok(ReconcileOutcome::Ready)
}
