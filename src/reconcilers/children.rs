// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Owned child objects.
//!
//! Each gateway object owns exactly one child of the next level, with the same
//! name and namespace. Children are written with server-side apply and carry a
//! controller owner reference so deleting the parent cascades.

use super::retry::retry_api_call;
use crate::constants::FIELD_MANAGER;
use crate::labels::{K8S_MANAGED_BY, K8S_PART_OF, PART_OF_EGRESS_GATEWAY};
use anyhow::{anyhow, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, info};

/// Controller owner reference pointing at `owner`.
///
/// # Errors
///
/// Fails when the owner has not been persisted yet and has no UID.
pub fn owner_reference<T>(owner: &T) -> Result<OwnerReference>
where
    T: Resource<DynamicType = ()>,
{
    let uid = owner
        .meta()
        .uid
        .clone()
        .ok_or_else(|| anyhow!("{} {} has no uid", T::kind(&()), owner.name_any()))?;
    Ok(OwnerReference {
        api_version: T::api_version(&()).to_string(),
        kind: T::kind(&()).to_string(),
        name: owner.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Labels put on every child object.
#[must_use]
pub fn child_labels(managed_by: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_MANAGED_BY.to_string(), managed_by.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_EGRESS_GATEWAY.to_string()),
    ])
}

/// Create or update the child `C` with the given spec, returning the stored object.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn apply_child<C, S>(
    client: &Client,
    namespace: &str,
    name: &str,
    spec: &S,
    owner: OwnerReference,
    managed_by: &str,
) -> Result<C>
where
    C: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned,
    S: Serialize,
{
    let api: Api<C> = Api::namespaced(client.clone(), namespace);
    let patch = json!({
        "apiVersion": C::api_version(&()),
        "kind": C::kind(&()),
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": child_labels(managed_by),
            "ownerReferences": [owner],
        },
        "spec": spec,
    });

    let applied = api
        .patch(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&patch))
        .await?;
    debug!("Applied {} {}/{}", C::kind(&()), namespace, name);
    Ok(applied)
}

/// Fetch the child `C`, if it exists.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn get_child<C>(client: &Client, namespace: &str, name: &str) -> Result<Option<C>>
where
    C: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned,
{
    let api: Api<C> = Api::namespaced(client.clone(), namespace);
    retry_api_call(
        || async { api.get_opt(name).await },
        &format!("get {} {namespace}/{name}", C::kind(&())),
    )
    .await
}

/// Request deletion of `child` unless it is already being deleted.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails. A child that is
/// already gone is not an error.
pub async fn delete_child<C>(client: &Client, child: &C) -> Result<()>
where
    C: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned,
{
    if child.meta().deletion_timestamp.is_some() {
        debug!("{} {} already being deleted", C::kind(&()), child.name_any());
        return Ok(());
    }

    let namespace = child.namespace().unwrap_or_default();
    let name = child.name_any();
    info!("Deleting {} {}/{}", C::kind(&()), namespace, name);

    let api: Api<C> = Api::namespaced(client.clone(), &namespace);
    match api.delete(&name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "children_tests.rs"]
mod children_tests;
