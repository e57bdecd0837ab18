// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::CloudConfig;
    use crate::gateway_errors::GatewayError;
    use serde_json::json;
    use std::io::Write;

    fn sample() -> serde_json::Value {
        json!({
            "subscriptionId": "sub1",
            "location": "westus2",
            "resourceGroup": "rg",
            "loadBalancerName": "kubeegressgateway-ilb",
            "vnetResourceGroup": "vnetrg",
            "vnetName": "vnet",
            "subnetName": "gateway",
            "nodeResourceGroup": "noderg"
        })
    }

    fn write_config(value: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_load_applies_defaults() {
        let file = write_config(&sample());
        let config = CloudConfig::from_file(file.path()).unwrap();

        assert_eq!(config.cloud, "https://management.azure.com");
        assert_eq!(config.health_probe_port, 8082);
        assert_eq!(config.load_balancer_name, "kubeegressgateway-ilb");
    }

    #[test]
    fn test_load_rejects_empty_required_field() {
        let mut value = sample();
        value["subnetName"] = json!("");
        let file = write_config(&value);

        let err = CloudConfig::from_file(file.path()).unwrap_err();
        let gateway_err = err.downcast_ref::<GatewayError>().unwrap();
        assert_eq!(
            gateway_err,
            &GatewayError::InvalidConfig {
                reason: "subnetName must not be empty".into()
            }
        );
    }

    #[test]
    fn test_load_rejects_missing_field() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("vnetName");
        let file = write_config(&value);

        assert!(CloudConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_probe_port() {
        let mut config: CloudConfig = serde_json::from_value(sample()).unwrap();
        config.health_probe_port = 0;
        assert!(config.validate().is_err());
        config.health_probe_port = 8082;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CloudConfig::from_file(std::path::Path::new("/nonexistent/cloud.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read cloud config"));
    }
}
