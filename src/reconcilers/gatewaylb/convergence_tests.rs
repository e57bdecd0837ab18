// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `convergence.rs`

#[cfg(test)]
mod tests {
    use super::super::{converge_load_balancer, health_probe_path, rule_matches, LbNames};
    use crate::azure::mock::MockCloudClient;
    use crate::azure::types::*;
    use crate::azure::CloudError;
    use crate::config::{test_cloud_config, CloudConfig};
    use crate::gateway_errors::GatewayError;

    const RG: &str = "rg";
    const LB: &str = "kubeegressgateway-ilb";

    fn setup() -> (MockCloudClient, CloudConfig) {
        let cloud = MockCloudClient::new("sub1");
        cloud.insert_subnet(
            "vnetrg",
            "vnet",
            Subnet {
                id: Some("/subscriptions/sub1/resourceGroups/vnetrg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/gateway".into()),
                name: Some("gateway".into()),
                properties: SubnetProperties {
                    address_prefix: Some("10.243.0.0/16".into()),
                },
            },
        );
        (cloud, test_cloud_config())
    }

    fn lb(cloud: &MockCloudClient) -> LoadBalancer {
        cloud.load_balancer(RG, LB).expect("load balancer exists")
    }

    #[tokio::test]
    async fn test_empty_lb_gets_frontend_backend_rule_and_probe() {
        let (cloud, config) = setup();

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        assert_eq!(result.port, Some(6000));
        assert!(result.frontend_ip.is_some(), "new frontend IP is read back from the write");

        let lb = lb(&cloud);
        let props = &lb.properties;
        assert_eq!(props.frontend_ip_configurations.len(), 1);
        assert_eq!(props.frontend_ip_configurations[0].name, "vmss1");
        assert_eq!(props.backend_address_pools.len(), 1);
        assert_eq!(props.backend_address_pools[0].name, "vmss1");

        assert_eq!(props.load_balancing_rules.len(), 1);
        let rule = &props.load_balancing_rules[0];
        assert_eq!(rule.name, "cfg1");
        assert_eq!(rule.properties.frontend_port, Some(6000));
        assert_eq!(rule.properties.backend_port, Some(6000));
        assert_eq!(rule.properties.protocol, Some(TransportProtocol::Udp));
        assert_eq!(rule.properties.enable_floating_ip, Some(true));

        assert_eq!(props.probes.len(), 1);
        let probe = &props.probes[0];
        assert_eq!(probe.name, "cfg1");
        assert_eq!(probe.properties.port, Some(8082));
        assert_eq!(probe.properties.request_path.as_deref(), Some("/gw/cfg1"));
        assert_eq!(cloud.writes().load_balancer_writes, 1);
    }

    #[tokio::test]
    async fn test_second_gateway_on_same_pool_gets_next_port() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();
        let first_rule = lb(&cloud).properties.load_balancing_rules[0].clone();

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg2", true)
            .await
            .unwrap();

        assert_eq!(result.port, Some(6001));
        let lb = lb(&cloud);
        assert_eq!(lb.properties.frontend_ip_configurations.len(), 1, "frontend is shared");
        assert_eq!(lb.properties.load_balancing_rules.len(), 2);
        assert_eq!(lb.properties.probes.len(), 2);
        assert_eq!(lb.properties.load_balancing_rules[0], first_rule);
    }

    #[tokio::test]
    async fn test_second_pass_performs_no_write() {
        let (cloud, config) = setup();
        let first = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();
        let writes = cloud.writes();

        let second = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        assert_eq!(cloud.writes(), writes);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_drifted_rule_and_probe_are_replaced() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        let mut drifted = lb(&cloud);
        drifted.properties.load_balancing_rules[0].properties.protocol = Some(TransportProtocol::Tcp);
        drifted.properties.load_balancing_rules[0].properties.enable_floating_ip = Some(false);
        drifted.properties.probes[0].properties.request_path = Some("/healthz".into());
        cloud.insert_load_balancer(RG, LB, drifted);

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        assert_eq!(result.port, Some(6000), "freed port is reused");
        let lb = lb(&cloud);
        let rule = &lb.properties.load_balancing_rules[0];
        assert_eq!(rule.properties.protocol, Some(TransportProtocol::Udp));
        assert_eq!(rule.properties.enable_floating_ip, Some(true));
        assert_eq!(
            lb.properties.probes[0].properties.request_path.as_deref(),
            Some("/gw/cfg1")
        );
    }

    #[tokio::test]
    async fn test_rule_reference_compare_is_case_insensitive() {
        let config = test_cloud_config();
        let names = LbNames::new(&config, "vmss1", "cfg1");
        let rule = LoadBalancingRule {
            id: None,
            name: "cfg1".into(),
            properties: LoadBalancingRuleProperties {
                protocol: Some(TransportProtocol::Udp),
                enable_floating_ip: Some(true),
                frontend_ip_configuration: Some(SubResource::new(names.frontend_id.to_uppercase())),
                backend_address_pool: Some(SubResource::new(names.backend_id.to_lowercase())),
                probe: Some(SubResource::new(&names.probe_id)),
                frontend_port: Some(6000),
                backend_port: Some(6000),
                ..Default::default()
            },
        };
        assert!(rule_matches(&rule, &names));

        let mut other_probe = rule.clone();
        other_probe.properties.probe = Some(SubResource::new(names.probe_id.replace("cfg1", "cfg9")));
        assert!(!rule_matches(&other_probe, &names));
    }

    #[tokio::test]
    async fn test_teardown_keeps_pool_while_other_rule_references_it() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg2", true)
            .await
            .unwrap();

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", false)
            .await
            .unwrap();

        assert_eq!(result.port, None);
        let lb = lb(&cloud);
        assert_eq!(lb.properties.frontend_ip_configurations.len(), 1);
        assert_eq!(lb.properties.backend_address_pools.len(), 1);
        assert_eq!(lb.properties.load_balancing_rules.len(), 1);
        assert_eq!(lb.properties.load_balancing_rules[0].name, "cfg2");
        assert_eq!(lb.properties.probes.len(), 1);
        assert_eq!(lb.properties.probes[0].name, "cfg2");
    }

    #[tokio::test]
    async fn test_teardown_of_last_rule_removes_pool_but_keeps_other_frontends() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();
        converge_load_balancer(&cloud, &config, "vmss2", "cfg2", true)
            .await
            .unwrap();

        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", false)
            .await
            .unwrap();

        let lb = lb(&cloud);
        let frontends: Vec<_> = lb
            .properties
            .frontend_ip_configurations
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(frontends, vec!["vmss2"]);
        assert_eq!(lb.properties.backend_address_pools.len(), 1);
        assert_eq!(lb.properties.backend_address_pools[0].name, "vmss2");
    }

    #[tokio::test]
    async fn test_teardown_of_last_frontend_deletes_lb() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", false)
            .await
            .unwrap();

        assert_eq!(result, Default::default());
        assert!(cloud.load_balancer(RG, LB).is_none());
        assert_eq!(cloud.writes().load_balancer_deletes, 1);
        assert_eq!(cloud.writes().load_balancer_writes, 1, "deletion replaces the patch");
    }

    #[tokio::test]
    async fn test_teardown_without_lb_is_noop() {
        let (cloud, config) = setup();

        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", false)
            .await
            .unwrap();

        assert_eq!(result, Default::default());
        assert_eq!(cloud.writes().total(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frontend_is_not_recreated() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        let mut broken = lb(&cloud);
        broken.properties.frontend_ip_configurations[0]
            .properties
            .private_ip_address_version = Some(IpVersion::IPv6);
        cloud.insert_load_balancer(RG, LB, broken);
        let writes = cloud.writes();

        let err = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<GatewayError>(),
            Some(GatewayError::MalformedFrontend { .. })
        ));
        assert_eq!(cloud.writes(), writes);
    }

    #[tokio::test]
    async fn test_concurrent_write_is_rejected() {
        let (cloud, config) = setup();
        converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap();

        // A wrapper that lets another writer slip in between read and write.
        struct Racing(MockCloudClient);

        #[async_trait::async_trait]
        impl crate::azure::CloudClient for Racing {
            async fn get_load_balancer(&self, rg: &str, name: &str) -> Result<LoadBalancer, CloudError> {
                let lb = self.0.get_load_balancer(rg, name).await;
                self.0.touch_load_balancer(rg, name);
                lb
            }
            async fn create_or_update_load_balancer(&self, rg: &str, name: &str, lb: &LoadBalancer, if_match: Option<&str>) -> Result<LoadBalancer, CloudError> {
                self.0.create_or_update_load_balancer(rg, name, lb, if_match).await
            }
            async fn delete_load_balancer(&self, rg: &str, name: &str, if_match: Option<&str>) -> Result<(), CloudError> {
                self.0.delete_load_balancer(rg, name, if_match).await
            }
            async fn list_vmss(&self, rg: &str) -> Result<Vec<VirtualMachineScaleSet>, CloudError> {
                self.0.list_vmss(rg).await
            }
            async fn get_vmss(&self, rg: &str, name: &str) -> Result<VirtualMachineScaleSet, CloudError> {
                self.0.get_vmss(rg, name).await
            }
            async fn create_or_update_vmss(&self, rg: &str, name: &str, vmss: &VirtualMachineScaleSet) -> Result<VirtualMachineScaleSet, CloudError> {
                self.0.create_or_update_vmss(rg, name, vmss).await
            }
            async fn list_vmss_vms(&self, rg: &str, vmss: &str) -> Result<Vec<VirtualMachineScaleSetVm>, CloudError> {
                self.0.list_vmss_vms(rg, vmss).await
            }
            async fn get_vmss_vm(&self, rg: &str, vmss: &str, id: &str) -> Result<VirtualMachineScaleSetVm, CloudError> {
                self.0.get_vmss_vm(rg, vmss, id).await
            }
            async fn update_vmss_vm(&self, rg: &str, vmss: &str, id: &str, vm: &VirtualMachineScaleSetVm) -> Result<VirtualMachineScaleSetVm, CloudError> {
                self.0.update_vmss_vm(rg, vmss, id, vm).await
            }
            async fn list_vms(&self, rg: &str) -> Result<Vec<VirtualMachine>, CloudError> {
                self.0.list_vms(rg).await
            }
            async fn get_vm(&self, rg: &str, name: &str) -> Result<VirtualMachine, CloudError> {
                self.0.get_vm(rg, name).await
            }
            async fn create_or_update_vm(&self, rg: &str, name: &str, vm: &VirtualMachine) -> Result<VirtualMachine, CloudError> {
                self.0.create_or_update_vm(rg, name, vm).await
            }
            async fn get_nic(&self, rg: &str, name: &str) -> Result<NetworkInterface, CloudError> {
                self.0.get_nic(rg, name).await
            }
            async fn get_vmss_vm_nic(&self, rg: &str, vmss: &str, id: &str, nic: &str) -> Result<NetworkInterface, CloudError> {
                self.0.get_vmss_vm_nic(rg, vmss, id, nic).await
            }
            async fn create_or_update_nic(&self, rg: &str, name: &str, nic: &NetworkInterface) -> Result<NetworkInterface, CloudError> {
                self.0.create_or_update_nic(rg, name, nic).await
            }
            async fn get_public_ip_prefix(&self, rg: &str, name: &str) -> Result<PublicIpPrefix, CloudError> {
                self.0.get_public_ip_prefix(rg, name).await
            }
            async fn create_or_update_public_ip_prefix(&self, rg: &str, name: &str, prefix: &PublicIpPrefix) -> Result<PublicIpPrefix, CloudError> {
                self.0.create_or_update_public_ip_prefix(rg, name, prefix).await
            }
            async fn delete_public_ip_prefix(&self, rg: &str, name: &str) -> Result<(), CloudError> {
                self.0.delete_public_ip_prefix(rg, name).await
            }
            async fn get_subnet(&self, rg: &str, vnet: &str, subnet: &str) -> Result<Subnet, CloudError> {
                self.0.get_subnet(rg, vnet, subnet).await
            }
        }

        let racing = Racing(cloud.clone());
        let err = converge_load_balancer(&racing, &config, "vmss1", "cfg2", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CloudError>(),
            Some(CloudError::Conflict { .. })
        ));
        assert_eq!(lb(&cloud).properties.load_balancing_rules.len(), 1, "losing write left no trace");

        // The retry from a fresh read succeeds.
        let result = converge_load_balancer(&cloud, &config, "vmss1", "cfg2", true)
            .await
            .unwrap();
        assert_eq!(result.port, Some(6001));
    }

    #[tokio::test]
    async fn test_missing_subnet_is_a_hard_error() {
        let cloud = MockCloudClient::new("sub1");
        let config = test_cloud_config();

        let err = converge_load_balancer(&cloud, &config, "vmss1", "cfg1", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<GatewayError>(),
            Some(GatewayError::ReferencedResourceNotFound { .. })
        ));
        assert_eq!(cloud.writes().total(), 0);
    }

    #[test]
    fn test_health_probe_path() {
        assert_eq!(health_probe_path("abc-123"), "/gw/abc-123");
    }
}
