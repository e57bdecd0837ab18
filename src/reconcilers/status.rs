// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for the gateway resources.
//!
//! Every resource reports one `Ready` condition:
//! - `type`: always `Ready`
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: a programmatic identifier (CamelCase), see [`crate::status_reasons`]
//! - `message`: a human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last status flip
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_egress_gateway::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "Ready",
//!     "Gateway is serving on 10.243.0.4:6000"
//! );
//! ```

use crate::crd::Condition;
use crate::gateway_errors::reason_for_error;
use crate::status_reasons::CONDITION_TYPE_READY;
use anyhow::Result;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Create a new condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is kept when the status does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        // Preserve lastTransitionTime if status hasn't changed
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Set the `Ready` condition (in-memory, no API call).
pub fn set_ready_condition(conditions: &mut Vec<Condition>, ready: bool, reason: &str, message: &str) {
    let status = if ready { "True" } else { "False" };
    update_condition_in_memory(conditions, CONDITION_TYPE_READY, status, reason, message);
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Merge-patch the status subresource of a namespaced resource.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn patch_status<T, S>(client: &Client, resource: &T, status: &S) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
    S: Serialize,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);

    let patch = json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!("Updated {} {}/{} status", T::kind(&()), namespace, name);
    Ok(())
}

/// Record a failed reconcile as `Ready=False` with the error's reason.
///
/// Skips the API call when the condition already says the same thing.
///
/// # Errors
///
/// Returns an error if the Kubernetes API call fails.
pub async fn record_failure<T>(
    client: &Client,
    resource: &T,
    current: &[Condition],
    err: &anyhow::Error,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let mut conditions = current.to_vec();
    set_ready_condition(&mut conditions, false, reason_for_error(err), &err.to_string());
    if conditions_equal(current, &conditions) {
        return Ok(());
    }
    patch_status(client, resource, &json!({ "conditions": conditions })).await
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
