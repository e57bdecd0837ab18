// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::*;
    use kube::CustomResourceExt;
    use serde_json::json;

    #[test]
    fn test_static_gateway_spec_deserializes_flattened_selector() {
        let spec: StaticGatewayConfigurationSpec = serde_json::from_value(json!({
            "gatewayNodepoolName": "gwpool",
            "excludeCidrs": ["10.0.0.0/8"]
        }))
        .unwrap();

        assert_eq!(spec.pool.gateway_nodepool_name.as_deref(), Some("gwpool"));
        assert!(spec.pool.gateway_vmss_profile.is_none());
        assert!(spec.provision_public_ips, "provisionPublicIps defaults to true");
        assert_eq!(spec.exclude_cidrs.unwrap().len(), 1);
    }

    #[test]
    fn test_vmss_profile_round_trips_camel_case() {
        let spec = GatewayVMConfigurationSpec {
            pool: GatewayPoolProfile {
                gateway_vmss_profile: Some(GatewayVmssProfile {
                    vmss_resource_group: "rg".into(),
                    vmss_name: "gwvmss".into(),
                    public_ip_prefix_size: 31,
                }),
                ..Default::default()
            },
            provision_public_ips: false,
            public_ip_prefix_id: None,
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["gatewayVmssProfile"]["vmssName"], "gwvmss");
        assert_eq!(value["gatewayVmssProfile"]["publicIpPrefixSize"], 31);
        assert_eq!(value["provisionPublicIps"], false);
        assert!(value.get("gatewayNodepoolName").is_none());
    }

    #[test]
    fn test_spec_conversion_preserves_selector() {
        let top = StaticGatewayConfigurationSpec {
            pool: GatewayPoolProfile {
                gateway_nodepool_name: Some("gwpool".into()),
                ..Default::default()
            },
            provision_public_ips: true,
            public_ip_prefix_id: Some("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/publicIPPrefixes/p".into()),
            default_route: Some("staticEgressGateway".into()),
            exclude_cidrs: None,
        };

        let lb = GatewayLBConfigurationSpec::from(&top);
        let vm = GatewayVMConfigurationSpec::from(&lb);

        assert_eq!(vm.pool, top.pool);
        assert_eq!(vm.public_ip_prefix_id, top.public_ip_prefix_id);
        assert!(vm.provision_public_ips);
    }

    #[test]
    fn test_vm_status_serializes_profiles() {
        let status = GatewayVMConfigurationStatus {
            conditions: vec![],
            gateway_vm_profiles: vec![GatewayVmProfileStatus {
                node_name: "node-0".into(),
                primary_ip: Some("10.0.0.4".into()),
                secondary_ip: Some("10.0.0.5".into()),
            }],
            egress_ip_prefix: Some("10.0.0.5".into()),
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["gatewayVmProfiles"][0]["nodeName"], "node-0");
        assert_eq!(value["gatewayVmProfiles"][0]["secondaryIp"], "10.0.0.5");
        assert_eq!(value["egressIpPrefix"], "10.0.0.5");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = GatewayLBConfiguration::crd();
        assert_eq!(crd.spec.group, "egressgateway.kubernetes.azure.com");
        assert_eq!(crd.spec.names.kind, "GatewayLBConfiguration");
        assert_eq!(crd.spec.scope, "Namespaced");

        let crd = StaticGatewayConfiguration::crd();
        assert_eq!(
            crd.spec.names.short_names,
            Some(vec!["sgc".to_string()])
        );
    }

    #[test]
    fn test_crds_share_group_and_version() {
        use crate::constants::{API_GROUP, API_GROUP_VERSION, API_VERSION};
        use kube::Resource;

        for crd in [
            StaticGatewayConfiguration::crd(),
            GatewayLBConfiguration::crd(),
            GatewayVMConfiguration::crd(),
        ] {
            assert_eq!(crd.spec.group, API_GROUP);
            assert_eq!(crd.spec.versions[0].name, API_VERSION);
        }
        assert_eq!(GatewayVMConfiguration::api_version(&()), API_GROUP_VERSION);
    }
}
