// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the egress gateway controller.
//!
//! All metrics carry the namespace prefix `egressgateway_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconcile outcomes and durations per kind
//! - **Cloud API Metrics** - ARM calls per resource kind, method and outcome
//! - **Load Balancer Metrics** - Ports handed out to gateway rules
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_egress_gateway::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("GatewayLBConfiguration", std::time::Duration::from_secs(1));
//! ```

use crate::azure::CloudError;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all controller metrics
const METRICS_NAMESPACE: &str = "egressgateway";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `GatewayLBConfiguration`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of reconcile errors by condition reason
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Status condition reason (e.g., `PortsExhausted`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of reconcile errors by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Cloud API Metrics
// ============================================================================

/// Total number of cloud API calls
///
/// Labels:
/// - `resource`: ARM resource kind (e.g., `loadBalancer`)
/// - `method`: HTTP method
/// - `outcome`: `success`, `not_found`, `conflict`, `rate_limited` or `error`
pub static CLOUD_API_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cloud_api_calls_total"),
        "Total number of cloud API calls by resource, method and outcome",
    );
    let counter = CounterVec::new(opts, &["resource", "method", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Load Balancer Metrics
// ============================================================================

/// Total number of load balancer ports handed out to new gateway rules
pub static LB_PORTS_ALLOCATED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_lb_ports_allocated_total"),
        "Total number of load balancer ports allocated to gateway rules",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconcile error under its condition reason
pub fn record_error(resource_type: &str, reason: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Outcome label of a cloud call.
#[must_use]
pub fn cloud_call_outcome<T>(result: &Result<T, CloudError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(CloudError::NotFound { .. }) => "not_found",
        Err(CloudError::Conflict { .. }) => "conflict",
        Err(CloudError::RateLimited { .. }) => "rate_limited",
        Err(_) => "error",
    }
}

/// Record one cloud API call, after retries
pub fn record_cloud_call<T>(resource: &str, method: &str, result: &Result<T, CloudError>) {
    CLOUD_API_CALLS_TOTAL
        .with_label_values(&[resource, method, cloud_call_outcome(result)])
        .inc();
}

/// Record a load balancer port handed out to a new rule
pub fn record_port_allocated() {
    LB_PORTS_ALLOCATED_TOTAL.inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
