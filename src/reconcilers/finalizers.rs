// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for the gateway custom resources.
//!
//! Cloud-side cleanup has to finish before Kubernetes may drop a
//! `GatewayLBConfiguration` or `GatewayVMConfiguration`. Each of them carries a
//! finalizer that is only removed once [`FinalizerCleanup::cleanup`] succeeds.
//!
//! # Example
//!
//! ```rust,ignore
//! use kube_egress_gateway::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
//! use kube_egress_gateway::labels::FINALIZER_VM_CONFIGURATION;
//!
//! async fn reconcile(ctx: &Context, vm_config: &GatewayVMConfiguration) -> Result<()> {
//!     if vm_config.metadata.deletion_timestamp.is_some() {
//!         return handle_deletion(ctx, vm_config, FINALIZER_VM_CONFIGURATION).await;
//!     }
//!     ensure_finalizer(&ctx.client, vm_config, FINALIZER_VM_CONFIGURATION).await?;
//!     // Normal reconciliation logic...
//!     Ok(())
//! }
//! ```

use crate::context::Context;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Trait for resources that require cleanup operations when being deleted.
#[async_trait::async_trait]
pub trait FinalizerCleanup: Resource + ResourceExt + Clone {
    /// Undo everything the resource converged in the cloud.
    ///
    /// # Errors
    ///
    /// If this method returns an error, the finalizer will NOT be removed and
    /// deletion will be blocked until cleanup succeeds.
    async fn cleanup(&self, ctx: &Context) -> Result<()>;
}

/// Whether a resource carries the given finalizer.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Remove a finalizer from a resource. Idempotent.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Run cleanup and then remove the finalizer.
///
/// Does nothing when the finalizer is already gone. If cleanup fails the
/// finalizer stays and deletion is retried on the next reconciliation.
///
/// # Errors
///
/// Returns an error if cleanup or the finalizer removal fails.
pub async fn handle_deletion<T>(ctx: &Context, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!("Running cleanup for {} {}/{}", T::kind(&()), namespace, name);

    resource.cleanup(ctx).await?;
    remove_finalizer(&ctx.client, resource, finalizer).await?;

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
