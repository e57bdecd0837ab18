// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{cloud_backoff, default_backoff, is_retryable_error, retry_cloud_call};
    use crate::azure::CloudError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn api_error(code: u16) -> kube::Error {
        let status: kube::core::Status = serde_json::from_value(serde_json::json!({
            "status": "Failure",
            "message": "test",
            "reason": "Test",
            "code": code,
        }))
        .unwrap();
        kube::Error::Api(Box::new(status))
    }

    #[test]
    fn test_backoff_configuration() {
        let backoff = default_backoff();
        assert_eq!(backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(backoff.max_interval, Duration::from_secs(30));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(300)));

        let cloud = cloud_backoff();
        assert_eq!(cloud.initial_interval, Duration::from_millis(50));
        assert_eq!(cloud.max_interval, Duration::from_secs(10));
        assert_eq!(cloud.max_elapsed_time, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_kube_retryable_codes() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(500)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(!is_retryable_error(&api_error(400)));
        assert!(!is_retryable_error(&api_error(404)));
        assert!(!is_retryable_error(&api_error(409)));
    }

    #[test]
    fn test_next_backoff_grows_and_caps() {
        let mut backoff = cloud_backoff();
        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(45) && first <= Duration::from_millis(55));

        for _ in 0..20 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.current_interval, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_retry_cloud_call_retries_throttling() {
        let calls = AtomicUsize::new(0);
        let mut backoff = cloud_backoff();

        let result = retry_cloud_call(
            &mut backoff,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CloudError::RateLimited {
                            message: "throttled".into(),
                        })
                    } else {
                        Ok(n)
                    }
                }
            },
            "get loadBalancer",
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_cloud_call_fails_fast_on_not_found_and_conflict() {
        for err in [
            CloudError::not_found("loadBalancer", "lb"),
            CloudError::Conflict {
                resource: "lb".into(),
            },
        ] {
            let calls = AtomicUsize::new(0);
            let mut backoff = cloud_backoff();
            let expected = err.clone();

            let result: Result<(), CloudError> = retry_cloud_call(
                &mut backoff,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let err = err.clone();
                    async move { Err(err) }
                },
                "put loadBalancer",
            )
            .await;

            assert_eq!(result.unwrap_err(), expected);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
