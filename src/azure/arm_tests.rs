// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `arm.rs`

#[cfg(test)]
mod tests {
    use super::super::ArmClient;
    use crate::azure::types::{LoadBalancer, PublicIpPrefix};
    use crate::azure::{CloudClient, CloudError};
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LB_PATH: &str =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/loadBalancers/lb1";

    fn client(server: &MockServer) -> ArmClient {
        ArmClient::new(&server.uri(), "sub1", None).unwrap()
    }

    #[tokio::test]
    async fn test_get_load_balancer_parses_arm_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LB_PATH))
            .and(query_param("api-version", "2023-09-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "lb1",
                "etag": "W/\"3\"",
                "properties": {
                    "frontendIPConfigurations": [{
                        "name": "vmss1",
                        "properties": {
                            "privateIPAddress": "10.0.0.10",
                            "privateIPAddressVersion": "IPv4"
                        }
                    }],
                    "loadBalancingRules": [{
                        "name": "cfg1",
                        "properties": {"protocol": "Udp", "frontendPort": 6000, "backendPort": 6000, "enableFloatingIP": true}
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let lb = client(&server).get_load_balancer("rg1", "lb1").await.unwrap();
        assert_eq!(lb.etag.as_deref(), Some("W/\"3\""));
        let frontend = &lb.properties.frontend_ip_configurations[0];
        assert_eq!(frontend.properties.private_ip_address.as_deref(), Some("10.0.0.10"));
        let rule = &lb.properties.load_balancing_rules[0];
        assert_eq!(rule.properties.frontend_port, Some(6000));
        assert_eq!(rule.properties.enable_floating_ip, Some(true));
    }

    #[tokio::test]
    async fn test_not_found_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LB_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("ResourceNotFound"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .get_load_balancer("rg1", "lb1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_sends_if_match_and_maps_precondition_failed() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(LB_PATH))
            .and(header("If-Match", "W/\"1\""))
            .respond_with(ResponseTemplate::new(412))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .create_or_update_load_balancer("rg1", "lb1", &LoadBalancer::default(), Some("W/\"1\""))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CloudError::Conflict {
                resource: "lb1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        let prefix_path = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/publicIPPrefixes/p1";
        Mock::given(method("GET"))
            .and(path(prefix_path))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(prefix_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "p1",
                "properties": {"prefixLength": 31, "ipPrefix": "20.1.2.4/31"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prefix: PublicIpPrefix = client(&server)
            .get_public_ip_prefix("rg1", "p1")
            .await
            .unwrap();
        assert_eq!(prefix.properties.ip_prefix.as_deref(), Some("20.1.2.4/31"));
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(LB_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("InvalidRequest"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_load_balancer("rg1", "lb1", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CloudError::Api {
                status: 400,
                message: "InvalidRequest".into()
            }
        );
    }

    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        let list_path =
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachineScaleSets";
        Mock::given(method("GET"))
            .and(path(list_path))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "vmss2"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(list_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "vmss1", "tags": {"aks-managed-poolName": "gw"}}],
                "nextLink": format!("{}{}?api-version=2024-03-01&page=2", server.uri(), list_path)
            })))
            .mount(&server)
            .await;

        let vmss = client(&server).list_vmss("rg1").await.unwrap();
        let names: Vec<_> = vmss.iter().filter_map(|v| v.name.clone()).collect();
        assert_eq!(names, vec!["vmss1", "vmss2"]);
        assert_eq!(vmss[0].tags.get("aks-managed-poolName").map(String::as_str), Some("gw"));
    }

    #[tokio::test]
    async fn test_bearer_token_read_from_file() {
        let mut token_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(token_file, "secret-token").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LB_PATH))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "lb1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ArmClient::new(&server.uri(), "sub1", Some(token_file.path().to_path_buf())).unwrap();
        let lb = client.get_load_balancer("rg1", "lb1").await.unwrap();
        assert_eq!(lb.name.as_deref(), Some("lb1"));
    }

    #[tokio::test]
    async fn test_missing_token_file_is_token_error() {
        let client = ArmClient::new("http://127.0.0.1:9", "sub1", Some("/nonexistent/token".into())).unwrap();
        let err = client.get_load_balancer("rg1", "lb1").await.unwrap_err();
        assert!(matches!(err, CloudError::Token(_)));
    }
}
