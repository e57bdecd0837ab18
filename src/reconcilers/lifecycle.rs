// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deletion state machine shared by the finalizer-carrying resources.
//!
//! ```text
//! Active ──delete──▶ ChildrenPending ──child gone──▶ SelfCleanup ──finalizer removed──▶ Removed
//! ```
//!
//! A `GatewayLBConfiguration` waits in `ChildrenPending` until its
//! `GatewayVMConfiguration` is gone, so NIC configuration is always retracted
//! before the load balancer rule it points at. A `GatewayVMConfiguration` has
//! no child and goes straight to `SelfCleanup`.

use super::finalizers::has_finalizer;
use kube::Resource;

/// Where a resource stands in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Not being deleted; converge towards the spec.
    Active,
    /// Being deleted, waiting for a dependent child object to disappear.
    ChildrenPending,
    /// Being deleted, child gone; retract cloud state and drop the finalizer.
    SelfCleanup,
    /// Being deleted with the finalizer already removed; nothing left to do.
    Removed,
}

/// Compute the phase from the deletion timestamp, finalizer and child presence.
#[must_use]
pub fn lifecycle_phase(deleting: bool, has_finalizer: bool, child_exists: bool) -> LifecyclePhase {
    match (deleting, has_finalizer, child_exists) {
        (false, _, _) => LifecyclePhase::Active,
        (true, false, _) => LifecyclePhase::Removed,
        (true, true, true) => LifecyclePhase::ChildrenPending,
        (true, true, false) => LifecyclePhase::SelfCleanup,
    }
}

/// Phase of a resource carrying `finalizer`.
#[must_use]
pub fn phase_of<T: Resource>(resource: &T, finalizer: &str, child_exists: bool) -> LifecyclePhase {
    lifecycle_phase(
        resource.meta().deletion_timestamp.is_some(),
        has_finalizer(resource, finalizer),
        child_exists,
    )
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
