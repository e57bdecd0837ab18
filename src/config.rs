// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller configuration.
//!
//! The cloud configuration is a JSON file (camelCase keys) describing where the
//! shared load balancer lives, which subnet gateway frontends are placed in and
//! where node pools are discovered:
//!
//! ```json
//! {
//!   "subscriptionId": "00000000-0000-0000-0000-000000000000",
//!   "location": "westus2",
//!   "resourceGroup": "mc_rg",
//!   "loadBalancerName": "kubeegressgateway-ilb",
//!   "vnetResourceGroup": "vnet_rg",
//!   "vnetName": "aks-vnet",
//!   "subnetName": "gateway-subnet",
//!   "nodeResourceGroup": "mc_rg"
//! }
//! ```

use crate::constants::{DEFAULT_ARM_ENDPOINT, DEFAULT_HEALTH_PROBE_PORT};
use crate::gateway_errors::GatewayError;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_cloud() -> String {
    DEFAULT_ARM_ENDPOINT.to_string()
}

fn default_health_probe_port() -> i32 {
    DEFAULT_HEALTH_PROBE_PORT
}

/// Azure placement of the shared gateway resources.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    /// Azure Resource Manager endpoint
    #[serde(default = "default_cloud")]
    pub cloud: String,
    pub subscription_id: String,
    pub location: String,
    /// Resource group of the load balancer and managed public IP prefixes
    pub resource_group: String,
    pub load_balancer_name: String,
    pub vnet_resource_group: String,
    pub vnet_name: String,
    /// Subnet hosting gateway frontends
    pub subnet_name: String,
    /// Resource group searched for node pool scale sets
    pub node_resource_group: String,
    #[serde(default = "default_health_probe_port")]
    pub health_probe_port: i32,
}

impl CloudConfig {
    /// Read and validate a cloud configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or fails
    /// [`CloudConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cloud config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse cloud config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations with missing required fields.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] naming the first empty field, or
    /// an out-of-range health probe port.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let required = [
            ("cloud", &self.cloud),
            ("subscriptionId", &self.subscription_id),
            ("location", &self.location),
            ("resourceGroup", &self.resource_group),
            ("loadBalancerName", &self.load_balancer_name),
            ("vnetResourceGroup", &self.vnet_resource_group),
            ("vnetName", &self.vnet_name),
            ("subnetName", &self.subnet_name),
            ("nodeResourceGroup", &self.node_resource_group),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(GatewayError::InvalidConfig {
                reason: format!("{field} must not be empty"),
            });
        }

        if !(1..=65535).contains(&self.health_probe_port) {
            return Err(GatewayError::InvalidConfig {
                reason: format!("healthProbePort {} is not a valid port", self.health_probe_port),
            });
        }

        Ok(())
    }
}

/// Configuration used by unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_cloud_config() -> CloudConfig {
    CloudConfig {
        cloud: DEFAULT_ARM_ENDPOINT.to_string(),
        subscription_id: "sub1".to_string(),
        location: "westus2".to_string(),
        resource_group: "rg".to_string(),
        load_balancer_name: "kubeegressgateway-ilb".to_string(),
        vnet_resource_group: "vnetrg".to_string(),
        vnet_name: "vnet".to_string(),
        subnet_name: "gateway".to_string(),
        node_resource_group: "noderg".to_string(),
        health_probe_port: DEFAULT_HEALTH_PROBE_PORT,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
