// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resource_id.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::gateway_errors::GatewayError;

    #[test]
    fn test_parse_public_ip_prefix() {
        let id = ResourceId::parse(
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPPrefixes/prefix1",
        )
        .unwrap();

        assert_eq!(id.subscription_id, "sub1");
        assert_eq!(id.resource_group, "rg1");
        assert_eq!(id.provider, "Microsoft.Network");
        assert_eq!(id.resource_type, "publicIPPrefixes");
        assert_eq!(id.name, "prefix1");
    }

    #[test]
    fn test_parse_is_case_insensitive_on_keys() {
        let id = ResourceId::parse(
            "/SUBSCRIPTIONS/sub1/resourcegroups/rg1/PROVIDERS/Microsoft.Network/publicIPPrefixes/p",
        )
        .unwrap();
        assert_eq!(id.resource_group, "rg1");
        assert_eq!(id.name, "p");
    }

    #[test]
    fn test_parse_nested_resource_keeps_parent() {
        let id = ResourceId::parse(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/sn",
        )
        .unwrap();
        assert_eq!(id.resource_type, "virtualNetworks");
        assert_eq!(id.name, "vnet");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for bad in [
            "",
            "not-an-id",
            "/subscriptions/s/providers/Microsoft.Network/publicIPPrefixes/p",
            "/subscriptions/s/resourceGroups/rg/publicIPPrefixes/p",
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPPrefixes",
            "/subscriptions//resourceGroups/rg/providers/Microsoft.Network/publicIPPrefixes/p",
        ] {
            let err = ResourceId::parse(bad).unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidResourceId { .. }),
                "expected parse failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        let raw = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb";
        assert_eq!(ResourceId::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn test_builders() {
        assert_eq!(
            subnet_id("s", "vnetrg", "vnet", "sn"),
            "/subscriptions/s/resourceGroups/vnetrg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/sn"
        );
        assert_eq!(
            load_balancer_id("s", "rg", "lb").child("frontendIPConfigurations", "pool"),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb/frontendIPConfigurations/pool"
        );
        assert!(public_ip_prefix_id("s", "rg", "p").ends_with("/publicIPPrefixes/p"));
    }
}
