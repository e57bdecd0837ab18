// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `staticgateway.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    fn lb_status(
        frontend_ip: Option<&str>,
        port: Option<i32>,
        egress: Option<&str>,
    ) -> GatewayLBConfigurationStatus {
        GatewayLBConfigurationStatus {
            conditions: vec![],
            frontend_ip: frontend_ip.map(Into::into),
            server_port: port,
            egress_ip_prefix: egress.map(Into::into),
        }
    }

    #[test]
    fn test_no_lb_status_is_not_ready() {
        let view = gateway_view(None);
        assert_eq!(view, GatewayView::default());
        assert!(!view.is_ready());
    }

    #[test]
    fn test_full_lb_status_is_ready() {
        let status = lb_status(Some("10.243.0.4"), Some(6000), Some("203.0.113.0/31"));
        let view = gateway_view(Some(&status));

        assert!(view.is_ready());
        assert_eq!(
            view.server_profile,
            Some(GatewayServerProfile {
                ip: Some("10.243.0.4".into()),
                port: Some(6000),
            })
        );
        assert_eq!(view.egress_ip_prefix.as_deref(), Some("203.0.113.0/31"));
    }

    #[test]
    fn test_missing_port_hides_server_profile() {
        let status = lb_status(Some("10.243.0.4"), None, Some("203.0.113.0/31"));
        let view = gateway_view(Some(&status));
        assert!(view.server_profile.is_none());
        assert!(!view.is_ready());
    }

    #[test]
    fn test_missing_egress_prefix_is_not_ready() {
        let status = lb_status(Some("10.243.0.4"), Some(6001), None);
        let view = gateway_view(Some(&status));
        assert!(view.server_profile.is_some());
        assert!(!view.is_ready());
    }
}
