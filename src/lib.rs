// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # kube-egress-gateway - Static egress gateways for Kubernetes on Azure
//!
//! The controller gives cluster workloads a fixed egress path: a pool of gateway
//! nodes behind a shared internal load balancer, each node carrying an extra IP
//! configuration that allocates from a public IP prefix.
//!
//! ## Overview
//!
//! This library provides:
//!
//! - Custom Resource Definitions (CRDs) for gateways and their LB/VM halves
//! - Convergence of the shared load balancer, including port allocation
//! - Convergence of the gateway IP configuration on scale set and VM NICs
//! - Managed and caller-supplied public IP prefix handling
//! - A finalizer chain that tears cloud state down child before parent
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`azure`] - Cloud resource model, ARM client and in-memory test client
//! - [`config`] - Cloud configuration loading and validation
//! - [`context`] - Shared context handed to every controller
//! - [`gateway_errors`] - Convergence error taxonomy
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use kube_egress_gateway::crd::{GatewayPoolProfile, StaticGatewayConfigurationSpec};
//!
//! let spec = StaticGatewayConfigurationSpec {
//!     pool: GatewayPoolProfile {
//!         gateway_nodepool_name: Some("gwpool".to_string()),
//!         ..Default::default()
//!     },
//!     provision_public_ips: true,
//!     public_ip_prefix_id: None,
//!     default_route: None,
//!     exclude_cidrs: None,
//! };
//! ```

pub mod azure;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod gateway_errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
