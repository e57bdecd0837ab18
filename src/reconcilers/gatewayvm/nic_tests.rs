// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `nic.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::azure::types::*;
    use crate::gateway_errors::GatewayError;

    const SUBNET: &str =
        "/subscriptions/sub1/resourceGroups/vnetrg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/subnet-1";
    const POOL: &str =
        "/subscriptions/sub1/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/kubeegressgateway-ilb/backendAddressPools/vmss1";
    const PREFIX: &str =
        "/subscriptions/sub1/resourceGroups/rg/providers/Microsoft.Network/publicIPPrefixes/egressgateway-uid1";

    fn primary_vmss_config() -> VirtualMachineScaleSetIpConfiguration {
        VirtualMachineScaleSetIpConfiguration {
            name: "ipconfig1".into(),
            properties: VirtualMachineScaleSetIpConfigurationProperties {
                primary: Some(true),
                private_ip_address_version: Some(IpVersion::IPv4),
                subnet: Some(SubResource::new(SUBNET)),
                ..Default::default()
            },
        }
    }

    fn target(want: bool, prefix: Option<&'static str>) -> NicTarget<'static> {
        NicTarget {
            ip_config_name: "default_gw1",
            want_ip_config: want,
            public_ip_prefix_id: prefix,
            backend_pool_id: POOL,
        }
    }

    #[test]
    fn test_gateway_ip_config_name() {
        assert_eq!(gateway_ip_config_name("default", "gw1"), "default_gw1");
    }

    #[test]
    fn test_differs_is_false_for_identical_configs() {
        let a = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some(SUBNET), Some(PREFIX));
        assert!(!ip_config_differs(&a, &a.clone()));

        let b = InterfaceIpConfiguration::gateway("gw", Some(SUBNET), None);
        assert!(!ip_config_differs(&b, &b.clone()));
    }

    #[test]
    fn test_differs_ignores_id_case() {
        let upper_prefix = PREFIX.to_uppercase();
        let a = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some("Subnet-1"), Some(PREFIX));
        let b = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some("subnet-1"), Some(upper_prefix.as_str()));
        assert!(!ip_config_differs(&a, &b));
    }

    #[test]
    fn test_differs_on_each_compared_field() {
        let base = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some(SUBNET), Some(PREFIX));

        let mut primary = base.clone();
        primary.properties.primary = Some(true);
        assert!(ip_config_differs(&base, &primary));

        let mut version = base.clone();
        version.properties.private_ip_address_version = Some(IpVersion::IPv6);
        assert!(ip_config_differs(&base, &version));

        let subnet = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some("subnet-2"), Some(PREFIX));
        assert!(ip_config_differs(&base, &subnet));

        let other_prefix =
            VirtualMachineScaleSetIpConfiguration::gateway("gw", Some(SUBNET), Some("other-prefix"));
        assert!(ip_config_differs(&base, &other_prefix));

        let no_public = VirtualMachineScaleSetIpConfiguration::gateway("gw", Some(SUBNET), None);
        assert!(ip_config_differs(&base, &no_public));
    }

    #[test]
    fn test_adds_gateway_config_and_pool_membership() {
        let mut configs = vec![primary_vmss_config()];

        let changed = converge_ip_configurations(&mut configs, &target(true, Some(PREFIX)), "vmss1").unwrap();

        assert!(changed);
        assert_eq!(configs.len(), 2);
        let gateway = &configs[1];
        assert_eq!(gateway.name, "default_gw1");
        assert_eq!(gateway.properties.primary, Some(false));
        assert_eq!(gateway.subnet_id(), Some(SUBNET), "gateway config shares the primary subnet");
        assert_eq!(gateway.public_ip_prefix_id(), Some(PREFIX));
        assert_eq!(
            configs[0].properties.load_balancer_backend_address_pools,
            vec![SubResource::new(POOL)]
        );
    }

    #[test]
    fn test_converged_configs_are_unchanged() {
        let mut configs = vec![primary_vmss_config()];
        converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap();
        let converged = configs.clone();

        let changed = converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap();

        assert!(!changed);
        assert_eq!(configs, converged);
    }

    #[test]
    fn test_drifted_gateway_config_is_replaced() {
        let mut configs = vec![primary_vmss_config()];
        converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap();

        let changed = converge_ip_configurations(&mut configs, &target(true, Some(PREFIX)), "vmss1").unwrap();

        assert!(changed);
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].public_ip_prefix_id(), Some(PREFIX));
    }

    #[test]
    fn test_removal_drops_config_and_pool_membership() {
        let mut configs = vec![primary_vmss_config()];
        converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap();

        let changed = converge_ip_configurations(&mut configs, &target(false, None), "vmss1").unwrap();

        assert!(changed);
        assert_eq!(configs.len(), 1);
        assert!(configs[0].properties.load_balancer_backend_address_pools.is_empty());
    }

    #[test]
    fn test_removal_keeps_other_pools() {
        let mut primary = primary_vmss_config();
        primary
            .properties
            .load_balancer_backend_address_pools
            .push(SubResource::new("/other/pool"));
        let mut configs = vec![primary];
        converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap();
        converge_ip_configurations(&mut configs, &target(false, None), "vmss1").unwrap();

        assert_eq!(
            configs[0].properties.load_balancer_backend_address_pools,
            vec![SubResource::new("/other/pool")]
        );
    }

    #[test]
    fn test_removal_on_clean_nic_is_noop() {
        let mut configs = vec![primary_vmss_config()];
        let changed = converge_ip_configurations(&mut configs, &target(false, None), "vmss1").unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_missing_primary_config_is_an_error() {
        let mut first = primary_vmss_config();
        first.properties.primary = None;
        let mut second = first.clone();
        second.name = "ipconfig2".into();
        let mut configs = vec![first, second];

        let err = converge_ip_configurations(&mut configs, &target(true, None), "vmss1").unwrap_err();
        assert_eq!(
            err,
            GatewayError::MissingPrimaryIpConfig {
                resource: "vmss1".into()
            }
        );
    }

    #[test]
    fn test_vmss_model_without_network_profile_is_an_error() {
        let mut vmss = VirtualMachineScaleSet::default();
        let err = converge_vmss_model(&mut vmss, &target(true, None), "vmss1").unwrap_err();
        assert!(matches!(err, GatewayError::MissingNetworkProfile { .. }));
    }

    fn nic_config(name: &str, primary: Option<bool>) -> VirtualMachineScaleSetNetworkConfiguration {
        VirtualMachineScaleSetNetworkConfiguration {
            name: name.into(),
            properties: VirtualMachineScaleSetNetworkConfigurationProperties {
                primary,
                ip_configurations: vec![primary_vmss_config()],
                ..Default::default()
            },
        }
    }

    fn vmss_with_nics(nics: Vec<VirtualMachineScaleSetNetworkConfiguration>) -> VirtualMachineScaleSet {
        VirtualMachineScaleSet {
            properties: VirtualMachineScaleSetProperties {
                virtual_machine_profile: Some(VirtualMachineScaleSetVmProfile {
                    network_profile: Some(VirtualMachineScaleSetNetworkProfile {
                        network_interface_configurations: nics,
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_vmss_model_without_primary_nic_is_an_error() {
        let mut vmss = vmss_with_nics(vec![nic_config("nic1", Some(false)), nic_config("nic2", None)]);

        let err = converge_vmss_model(&mut vmss, &target(true, None), "vmss1").unwrap_err();
        assert!(matches!(err, GatewayError::MissingPrimaryNic { .. }));
    }

    #[test]
    fn test_single_unflagged_nic_config_counts_as_primary() {
        let mut vmss = vmss_with_nics(vec![nic_config("nic", None)]);

        assert!(converge_vmss_model(&mut vmss, &target(true, None), "vmss1").unwrap());

        let profile = vmss.properties.virtual_machine_profile.as_ref().unwrap();
        let nic = &profile.network_profile.as_ref().unwrap().network_interface_configurations[0];
        assert_eq!(nic.properties.ip_configurations.len(), 2);
        assert_eq!(nic.properties.ip_configurations[1].name, "default_gw1");

        let vm = VirtualMachineScaleSetVm {
            properties: VirtualMachineScaleSetVmProperties {
                network_profile_configuration: Some(VirtualMachineScaleSetNetworkProfile {
                    network_interface_configurations: vec![nic_config("nic", None)],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(primary_instance_nic_name(&vm, "vm").unwrap(), "nic");
    }

    fn unflagged_interface_config() -> InterfaceIpConfiguration {
        InterfaceIpConfiguration {
            name: "ipconfig1".into(),
            properties: InterfaceIpConfigurationProperties {
                primary: None,
                subnet: Some(SubResource::new(SUBNET)),
                private_ip_address: Some("10.0.0.4".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_single_unflagged_ip_config_counts_as_primary() {
        let mut configs = vec![unflagged_interface_config()];

        let changed = converge_ip_configurations(&mut configs, &target(true, Some(PREFIX)), "nic").unwrap();

        assert!(changed);
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].properties.primary, None, "primary flag is left as found");
        assert_eq!(
            configs[0].properties.load_balancer_backend_address_pools,
            vec![SubResource::new(POOL)]
        );
        assert_eq!(configs[1].subnet_id(), Some(SUBNET));
        assert_eq!(configs[1].public_ip_prefix_id(), Some(PREFIX));

        // With the gateway config present, the other one is still found as primary
        let again = converge_ip_configurations(&mut configs, &target(true, Some(PREFIX)), "nic").unwrap();
        assert!(!again);

        let removed = converge_ip_configurations(&mut configs, &target(false, None), "nic").unwrap();
        assert!(removed);
        assert_eq!(configs.len(), 1);
        assert!(configs[0].properties.load_balancer_backend_address_pools.is_empty());
    }

    #[test]
    fn test_read_nic_addresses_with_unflagged_primary() {
        let mut nic = live_nic(false);
        nic.properties.ip_configurations[0].properties.primary = None;

        let addresses = read_nic_addresses(&nic, &target(true, None), "vm").unwrap();
        assert_eq!(addresses.primary_ip, "10.0.0.4");
        assert_eq!(addresses.secondary_ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_failed_instance_forces_update() {
        let mut configs = vec![primary_vmss_config()];
        converge_ip_configurations(&mut configs, &target(true, None), "vm").unwrap();
        let mut vm = VirtualMachineScaleSetVm {
            instance_id: Some("0".into()),
            properties: VirtualMachineScaleSetVmProperties {
                provisioning_state: Some("Failed".into()),
                network_profile_configuration: Some(VirtualMachineScaleSetNetworkProfile {
                    network_interface_configurations: vec![VirtualMachineScaleSetNetworkConfiguration {
                        name: "nic".into(),
                        properties: VirtualMachineScaleSetNetworkConfigurationProperties {
                            primary: Some(true),
                            ip_configurations: configs,
                            ..Default::default()
                        },
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(converge_vmss_instance(&mut vm, &target(true, None), "vm").unwrap());

        vm.properties.provisioning_state = Some("Succeeded".into());
        assert!(!converge_vmss_instance(&mut vm, &target(true, None), "vm").unwrap());
        assert_eq!(primary_instance_nic_name(&vm, "vm").unwrap(), "nic");
    }

    fn live_nic(gateway_public_ip: bool) -> NetworkInterface {
        NetworkInterface {
            name: Some("nic".into()),
            properties: NetworkInterfaceProperties {
                ip_configurations: vec![
                    InterfaceIpConfiguration {
                        name: "ipconfig1".into(),
                        properties: InterfaceIpConfigurationProperties {
                            primary: Some(true),
                            private_ip_address: Some("10.0.0.4".into()),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                    InterfaceIpConfiguration {
                        name: "default_gw1".into(),
                        properties: InterfaceIpConfigurationProperties {
                            primary: Some(false),
                            private_ip_address: Some("10.0.0.5".into()),
                            public_ip_address: gateway_public_ip.then(PublicIpAddress::default),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_read_nic_addresses() {
        let addresses = read_nic_addresses(&live_nic(true), &target(true, Some(PREFIX)), "vm").unwrap();
        assert_eq!(
            addresses,
            NicAddresses {
                primary_ip: "10.0.0.4".into(),
                secondary_ip: Some("10.0.0.5".into()),
            }
        );

        let addresses = read_nic_addresses(&live_nic(false), &target(false, None), "vm").unwrap();
        assert_eq!(addresses.secondary_ip, None);
    }

    #[test]
    fn test_read_nic_addresses_requires_public_ip_when_prefix_expected() {
        let err = read_nic_addresses(&live_nic(false), &target(true, Some(PREFIX)), "vm").unwrap_err();
        assert!(matches!(err, GatewayError::MissingPublicIp { .. }));
    }
}
