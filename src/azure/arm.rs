// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`CloudClient`] backed by the Azure Resource Manager REST API.
//!
//! Requests are authenticated with a bearer token read from a file on every call,
//! so a sidecar or projected volume can rotate it. Transient failures are retried
//! with [`crate::reconcilers::retry::cloud_backoff`]; everything else is mapped to
//! a [`CloudError`] and returned.

use super::error::CloudError;
use super::types::*;
use super::CloudClient;
use crate::constants::{
    ARM_REQUEST_TIMEOUT_SECS, COMPUTE_API_VERSION, NETWORK_API_VERSION, VMSS_NIC_API_VERSION,
};
use crate::metrics;
use crate::reconcilers::retry::{cloud_backoff, retry_cloud_call};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

const NETWORK: &str = "Microsoft.Network";
const COMPUTE: &str = "Microsoft.Compute";

/// One page of an ARM list response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

/// Azure Resource Manager client.
#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: Url,
    subscription_id: String,
    token_file: Option<PathBuf>,
}

impl ArmClient {
    /// Create a client for one subscription.
    ///
    /// `token_file` holds a bearer token; when `None`, requests are sent
    /// unauthenticated (useful against a local emulator).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(
        endpoint: &str,
        subscription_id: impl Into<String>,
        token_file: Option<PathBuf>,
    ) -> Result<Self, CloudError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CloudError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ARM_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            subscription_id: subscription_id.into(),
            token_file,
        })
    }

    /// Subscription this client operates in.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Build `<endpoint>/subscriptions/<sub>/resourceGroups/<rg>/providers/<provider>/<segments...>`.
    fn url(&self, resource_group: &str, provider: &str, segments: &[&str], api_version: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["subscriptions", self.subscription_id.as_str()])
                .extend(["resourceGroups", resource_group, "providers", provider])
                .extend(segments);
        }
        url.query_pairs_mut().append_pair("api-version", api_version);
        url
    }

    async fn token(&self) -> Result<Option<String>, CloudError> {
        let Some(path) = &self.token_file else {
            return Ok(None);
        };
        let token = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CloudError::Token(format!("{}: {e}", path.display())))?;
        Ok(Some(token.trim().to_string()))
    }

    /// Send one request, without retries. Returns `None` for empty bodies.
    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        kind: &str,
        name: &str,
        body: Option<&serde_json::Value>,
        if_match: Option<&str>,
    ) -> Result<Option<String>, CloudError> {
        debug!(method = %method, url = %url, kind = kind, name = name, "ARM request");

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(token) = self.token().await? {
            request = request.bearer_auth(token);
        }
        if let Some(etag) = if_match {
            request = request.header("If-Match", etag);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status != StatusCode::NOT_FOUND {
                error!(
                    method = %method,
                    url = %url,
                    status = %status,
                    error = %text,
                    "ARM request failed"
                );
            }
            return Err(CloudError::from_status(status, kind, name, text));
        }

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    /// Send with retries and record the outcome.
    async fn send(
        &self,
        method: Method,
        url: Url,
        kind: &str,
        name: &str,
        body: Option<serde_json::Value>,
        if_match: Option<&str>,
    ) -> Result<Option<String>, CloudError> {
        let operation = format!("{method} {kind}");
        let mut backoff = cloud_backoff();
        let result = retry_cloud_call(
            &mut backoff,
            || self.send_once(method.clone(), &url, kind, name, body.as_ref(), if_match),
            &operation,
        )
        .await;
        metrics::record_cloud_call(kind, method.as_str(), &result);
        result
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, kind: &str, name: &str) -> Result<T, CloudError> {
        let text = self
            .send(Method::GET, url, kind, name, None, None)
            .await?
            .ok_or_else(|| CloudError::Serialization(format!("empty response for {kind} '{name}'")))?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn put_json<T: Serialize + DeserializeOwned>(
        &self,
        url: Url,
        kind: &str,
        name: &str,
        resource: &T,
        if_match: Option<&str>,
    ) -> Result<T, CloudError> {
        let body = serde_json::to_value(resource)?;
        let text = self
            .send(Method::PUT, url, kind, name, Some(body), if_match)
            .await?
            .ok_or_else(|| CloudError::Serialization(format!("empty response for {kind} '{name}'")))?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete(&self, url: Url, kind: &str, name: &str, if_match: Option<&str>) -> Result<(), CloudError> {
        self.send(Method::DELETE, url, kind, name, None, if_match)
            .await
            .map(|_| ())
    }

    /// Follow `nextLink` until every page has been read.
    async fn list_all<T: DeserializeOwned>(&self, url: Url, kind: &str) -> Result<Vec<T>, CloudError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut page_count = 0;

        while let Some(url) = next.take() {
            page_count += 1;
            let text = self
                .send(Method::GET, url, kind, "", None, None)
                .await?
                .unwrap_or_default();
            let page: Page<T> = if text.is_empty() {
                Page {
                    value: Vec::new(),
                    next_link: None,
                }
            } else {
                serde_json::from_str(&text)?
            };
            items.extend(page.value);

            debug!(
                kind = kind,
                page = page_count,
                total_items = items.len(),
                "Fetched page from ARM"
            );

            next = match page.next_link {
                Some(link) if !link.is_empty() => Some(Url::parse(&link).map_err(|e| {
                    CloudError::Serialization(format!("invalid nextLink '{link}': {e}"))
                })?),
                _ => None,
            };
        }

        Ok(items)
    }
}

#[async_trait]
impl CloudClient for ArmClient {
    async fn get_load_balancer(&self, resource_group: &str, name: &str) -> Result<LoadBalancer, CloudError> {
        let url = self.url(resource_group, NETWORK, &["loadBalancers", name], NETWORK_API_VERSION);
        self.get_json(url, "loadBalancer", name).await
    }

    async fn create_or_update_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        load_balancer: &LoadBalancer,
        if_match: Option<&str>,
    ) -> Result<LoadBalancer, CloudError> {
        let url = self.url(resource_group, NETWORK, &["loadBalancers", name], NETWORK_API_VERSION);
        self.put_json(url, "loadBalancer", name, load_balancer, if_match)
            .await
    }

    async fn delete_load_balancer(
        &self,
        resource_group: &str,
        name: &str,
        if_match: Option<&str>,
    ) -> Result<(), CloudError> {
        let url = self.url(resource_group, NETWORK, &["loadBalancers", name], NETWORK_API_VERSION);
        self.delete(url, "loadBalancer", name, if_match).await
    }

    async fn list_vmss(&self, resource_group: &str) -> Result<Vec<VirtualMachineScaleSet>, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachineScaleSets"], COMPUTE_API_VERSION);
        self.list_all(url, "virtualMachineScaleSet").await
    }

    async fn get_vmss(&self, resource_group: &str, name: &str) -> Result<VirtualMachineScaleSet, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachineScaleSets", name], COMPUTE_API_VERSION);
        self.get_json(url, "virtualMachineScaleSet", name).await
    }

    async fn create_or_update_vmss(
        &self,
        resource_group: &str,
        name: &str,
        vmss: &VirtualMachineScaleSet,
    ) -> Result<VirtualMachineScaleSet, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachineScaleSets", name], COMPUTE_API_VERSION);
        self.put_json(url, "virtualMachineScaleSet", name, vmss, None)
            .await
    }

    async fn list_vmss_vms(
        &self,
        resource_group: &str,
        vmss_name: &str,
    ) -> Result<Vec<VirtualMachineScaleSetVm>, CloudError> {
        let url = self.url(
            resource_group,
            COMPUTE,
            &["virtualMachineScaleSets", vmss_name, "virtualMachines"],
            COMPUTE_API_VERSION,
        );
        self.list_all(url, "virtualMachineScaleSetVM").await
    }

    async fn get_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
    ) -> Result<VirtualMachineScaleSetVm, CloudError> {
        let url = self.url(
            resource_group,
            COMPUTE,
            &["virtualMachineScaleSets", vmss_name, "virtualMachines", instance_id],
            COMPUTE_API_VERSION,
        );
        self.get_json(url, "virtualMachineScaleSetVM", instance_id)
            .await
    }

    async fn update_vmss_vm(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        vm: &VirtualMachineScaleSetVm,
    ) -> Result<VirtualMachineScaleSetVm, CloudError> {
        let url = self.url(
            resource_group,
            COMPUTE,
            &["virtualMachineScaleSets", vmss_name, "virtualMachines", instance_id],
            COMPUTE_API_VERSION,
        );
        self.put_json(url, "virtualMachineScaleSetVM", instance_id, vm, None)
            .await
    }

    async fn list_vms(&self, resource_group: &str) -> Result<Vec<VirtualMachine>, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachines"], COMPUTE_API_VERSION);
        self.list_all(url, "virtualMachine").await
    }

    async fn get_vm(&self, resource_group: &str, name: &str) -> Result<VirtualMachine, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachines", name], COMPUTE_API_VERSION);
        self.get_json(url, "virtualMachine", name).await
    }

    async fn create_or_update_vm(
        &self,
        resource_group: &str,
        name: &str,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, CloudError> {
        let url = self.url(resource_group, COMPUTE, &["virtualMachines", name], COMPUTE_API_VERSION);
        self.put_json(url, "virtualMachine", name, vm, None).await
    }

    async fn get_nic(&self, resource_group: &str, name: &str) -> Result<NetworkInterface, CloudError> {
        let url = self.url(resource_group, NETWORK, &["networkInterfaces", name], NETWORK_API_VERSION);
        self.get_json(url, "networkInterface", name).await
    }

    async fn get_vmss_vm_nic(
        &self,
        resource_group: &str,
        vmss_name: &str,
        instance_id: &str,
        nic_name: &str,
    ) -> Result<NetworkInterface, CloudError> {
        let url = self.url(
            resource_group,
            COMPUTE,
            &[
                "virtualMachineScaleSets",
                vmss_name,
                "virtualMachines",
                instance_id,
                "networkInterfaces",
                nic_name,
            ],
            VMSS_NIC_API_VERSION,
        );
        self.get_json(url, "networkInterface", nic_name).await
    }

    async fn create_or_update_nic(
        &self,
        resource_group: &str,
        name: &str,
        nic: &NetworkInterface,
    ) -> Result<NetworkInterface, CloudError> {
        let url = self.url(resource_group, NETWORK, &["networkInterfaces", name], NETWORK_API_VERSION);
        self.put_json(url, "networkInterface", name, nic, None).await
    }

    async fn get_public_ip_prefix(&self, resource_group: &str, name: &str) -> Result<PublicIpPrefix, CloudError> {
        let url = self.url(resource_group, NETWORK, &["publicIPPrefixes", name], NETWORK_API_VERSION);
        self.get_json(url, "publicIPPrefix", name).await
    }

    async fn create_or_update_public_ip_prefix(
        &self,
        resource_group: &str,
        name: &str,
        prefix: &PublicIpPrefix,
    ) -> Result<PublicIpPrefix, CloudError> {
        let url = self.url(resource_group, NETWORK, &["publicIPPrefixes", name], NETWORK_API_VERSION);
        self.put_json(url, "publicIPPrefix", name, prefix, None).await
    }

    async fn delete_public_ip_prefix(&self, resource_group: &str, name: &str) -> Result<(), CloudError> {
        let url = self.url(resource_group, NETWORK, &["publicIPPrefixes", name], NETWORK_API_VERSION);
        self.delete(url, "publicIPPrefix", name, None).await
    }

    async fn get_subnet(
        &self,
        resource_group: &str,
        vnet_name: &str,
        subnet_name: &str,
    ) -> Result<Subnet, CloudError> {
        let url = self.url(
            resource_group,
            NETWORK,
            &["virtualNetworks", vnet_name, "subnets", subnet_name],
            NETWORK_API_VERSION,
        );
        self.get_json(url, "subnet", subnet_name).await
    }
}

#[cfg(test)]
#[path = "arm_tests.rs"]
mod arm_tests;
