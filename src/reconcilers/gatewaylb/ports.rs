// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Load balancer port allocation.
//!
//! Every gateway rule forwards one port, frontend port equal to backend port,
//! drawn from `[LB_PORT_RANGE_START, LB_PORT_RANGE_END)`. Ports only need to be
//! unique among rules sharing a backend pool, since the backend pool is what
//! the node-side gateway listens behind.
//!
//! Allocation is a bitmap scan over the rules of a single load balancer snapshot.
//! Two reconciles racing on the same snapshot can pick the same port; the etag
//! check on the load balancer write rejects the loser.

use crate::azure::types::{ids_equal, LoadBalancingRule};
use crate::constants::{LB_PORT_RANGE_END, LB_PORT_RANGE_START};
use crate::gateway_errors::GatewayError;

/// Pick the lowest free port for a new rule on `backend_pool_id`.
///
/// # Errors
///
/// - [`GatewayError::InvalidLbPort`] if a rule on the same backend pool has
///   mismatched or out-of-range ports.
/// - [`GatewayError::PortsExhausted`] if every port is in use.
pub fn allocate_port(rules: &[LoadBalancingRule], backend_pool_id: &str) -> Result<i32, GatewayError> {
    allocate_port_in_range(rules, backend_pool_id, LB_PORT_RANGE_START, LB_PORT_RANGE_END)
}

pub(crate) fn allocate_port_in_range(
    rules: &[LoadBalancingRule],
    backend_pool_id: &str,
    start: i32,
    end: i32,
) -> Result<i32, GatewayError> {
    let size = usize::try_from(end - start).unwrap_or(0);
    let mut used = vec![false; size];

    let sharing_pool = rules.iter().filter(|rule| {
        rule.properties
            .backend_address_pool
            .as_ref()
            .is_some_and(|pool| ids_equal(&pool.id, backend_pool_id))
    });

    for rule in sharing_pool {
        let frontend_port = rule.properties.frontend_port;
        let backend_port = rule.properties.backend_port;
        let invalid = || GatewayError::InvalidLbPort {
            rule: rule.name.clone(),
            frontend_port,
            backend_port,
        };

        let port = match (frontend_port, backend_port) {
            (Some(f), Some(b)) if f == b => f,
            _ => return Err(invalid()),
        };
        if port < start || port >= end {
            return Err(invalid());
        }
        // Bounds checked above.
        used[(port - start) as usize] = true;
    }

    used.iter()
        .position(|taken| !taken)
        .and_then(|slot| i32::try_from(slot).ok())
        .map(|slot| start + slot)
        .ok_or(GatewayError::PortsExhausted { start, end })
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod ports_tests;
