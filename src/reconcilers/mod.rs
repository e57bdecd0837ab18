// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for the egress gateway resources.
//!
//! # Reconciliation Architecture
//!
//! The controller follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor resource changes via Kubernetes API
//! 2. **Reconcile** - Compare desired state (CRD spec) with the cloud resources
//! 3. **Update** - Converge the load balancer, NICs and public IP prefix
//! 4. **Status** - Report reconciliation results back to Kubernetes
//!
//! # Available Reconcilers
//!
//! - [`reconcile_static_gateway_configuration`] - Applies the owned
//!   `GatewayLBConfiguration` and mirrors its status
//! - [`reconcile_gateway_lb_configuration`] - Converges the shared load balancer
//!   and applies the owned `GatewayVMConfiguration`
//! - [`reconcile_gateway_vm_configuration`] - Converges the gateway IP
//!   configuration on every pool NIC and the public IP prefix
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use kube_egress_gateway::context::Context;
//! use kube_egress_gateway::crd::GatewayVMConfiguration;
//! use kube_egress_gateway::reconcilers::reconcile_gateway_vm_configuration;
//! use std::sync::Arc;
//!
//! async fn reconcile(ctx: Arc<Context>, vm_config: GatewayVMConfiguration) -> anyhow::Result<()> {
//!     reconcile_gateway_vm_configuration(ctx, vm_config).await?;
//!     Ok(())
//! }
//! ```

pub mod children;
pub mod finalizers;
pub mod gatewaylb;
pub mod gatewayvm;
pub mod lifecycle;
pub mod retry;
pub mod staticgateway;
pub mod status;

pub use gatewaylb::reconcile_gateway_lb_configuration;
pub use gatewayvm::reconcile_gateway_vm_configuration;
pub use staticgateway::reconcile_static_gateway_configuration;

/// Result of a successful reconcile pass, used to pick the requeue interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Fully converged; check again on the slow interval.
    Ready,
    /// Waiting on a child object or an address allocation.
    Progressing,
    /// Deleted or being deleted; nothing to requeue.
    Removed,
}
