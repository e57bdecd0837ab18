// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! All controllers receive an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Cloud client used by the convergence core
//! - Cloud configuration (load balancer placement, node resource group)

use crate::azure::CloudClient;
use crate::config::CloudConfig;
use crate::constants::READY_REQUEUE_DURATION_SECS;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Cloud client for load balancer, compute and prefix operations
    pub cloud: Arc<dyn CloudClient>,

    /// Where the shared gateway resources live
    pub config: Arc<CloudConfig>,

    /// Requeue interval for converged resources
    pub ready_requeue: Duration,
}

impl Context {
    /// Build a context with the default requeue interval.
    #[must_use]
    pub fn new(client: Client, cloud: Arc<dyn CloudClient>, config: CloudConfig) -> Self {
        Self {
            client,
            cloud,
            config: Arc::new(config),
            ready_requeue: Duration::from_secs(READY_REQUEUE_DURATION_SECS),
        }
    }

    /// Override the requeue interval for converged resources.
    #[must_use]
    pub fn with_ready_requeue(mut self, ready_requeue: Duration) -> Self {
        self.ready_requeue = ready_requeue;
        self
    }
}
