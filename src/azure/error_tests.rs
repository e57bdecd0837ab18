// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `error.rs`

#[cfg(test)]
mod tests {
    use super::super::{ignore_not_found, CloudError};
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        let err = CloudError::from_status(StatusCode::NOT_FOUND, "loadBalancer", "lb", String::new());
        assert!(err.is_not_found());

        let err = CloudError::from_status(
            StatusCode::PRECONDITION_FAILED,
            "loadBalancer",
            "lb",
            String::new(),
        );
        assert_eq!(
            err,
            CloudError::Conflict {
                resource: "lb".into()
            }
        );

        let err = CloudError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            "loadBalancer",
            "lb",
            "slow down".into(),
        );
        assert!(err.is_retryable());

        let err = CloudError::from_status(StatusCode::BAD_GATEWAY, "loadBalancer", "lb", String::new());
        assert_eq!(
            err,
            CloudError::Server {
                status: 502,
                message: String::new()
            }
        );
        assert!(err.is_retryable());

        let err = CloudError::from_status(StatusCode::BAD_REQUEST, "loadBalancer", "lb", "bad".into());
        assert!(!err.is_retryable());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_conflict_is_not_retried_inline() {
        // A stale etag must go back to the reconciler for a fresh read.
        let err = CloudError::Conflict {
            resource: "lb".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_ignore_not_found() {
        let missing: Result<u8, CloudError> = Err(CloudError::not_found("publicIPPrefix", "p"));
        assert_eq!(ignore_not_found(missing).unwrap(), None);

        let found: Result<u8, CloudError> = Ok(7);
        assert_eq!(ignore_not_found(found).unwrap(), Some(7));

        let failed: Result<u8, CloudError> = Err(CloudError::Transport("reset".into()));
        assert!(ignore_not_found(failed).is_err());
    }
}
