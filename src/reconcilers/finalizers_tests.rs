// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{GatewayPoolProfile, GatewayVMConfiguration, GatewayVMConfigurationSpec};
    use crate::labels::{FINALIZER_LB_CONFIGURATION, FINALIZER_VM_CONFIGURATION};
    use crate::reconcilers::finalizers::has_finalizer;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const TEST_NAMESPACE: &str = "test-namespace";
    const TEST_NAME: &str = "test-resource";

    fn create_vm_config(finalizers: Option<Vec<String>>) -> GatewayVMConfiguration {
        GatewayVMConfiguration {
            metadata: ObjectMeta {
                name: Some(TEST_NAME.to_string()),
                namespace: Some(TEST_NAMESPACE.to_string()),
                finalizers,
                ..Default::default()
            },
            spec: GatewayVMConfigurationSpec {
                pool: GatewayPoolProfile {
                    gateway_nodepool_name: Some("gwpool".to_string()),
                    ..Default::default()
                },
                provision_public_ips: true,
                public_ip_prefix_id: None,
            },
            status: None,
        }
    }

    #[test]
    fn test_has_finalizer_without_finalizers() {
        let vm_config = create_vm_config(None);
        assert!(!has_finalizer(&vm_config, FINALIZER_VM_CONFIGURATION));
    }

    #[test]
    fn test_has_finalizer_matches_exactly() {
        let vm_config = create_vm_config(Some(vec![FINALIZER_VM_CONFIGURATION.to_string()]));
        assert!(has_finalizer(&vm_config, FINALIZER_VM_CONFIGURATION));
        assert!(!has_finalizer(&vm_config, FINALIZER_LB_CONFIGURATION));
    }

    #[test]
    fn test_has_finalizer_among_others() {
        let vm_config = create_vm_config(Some(vec![
            "other.example.com/finalizer".to_string(),
            FINALIZER_VM_CONFIGURATION.to_string(),
        ]));
        assert!(has_finalizer(&vm_config, FINALIZER_VM_CONFIGURATION));
    }

    #[test]
    fn test_finalizers_are_distinct_per_kind() {
        assert_ne!(FINALIZER_LB_CONFIGURATION, FINALIZER_VM_CONFIGURATION);
        assert!(FINALIZER_LB_CONFIGURATION.starts_with("egressgateway.kubernetes.azure.com/"));
    }
}
