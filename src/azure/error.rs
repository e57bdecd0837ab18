// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud API error types.
//!
//! Every cloud call surfaces "not found" and "precondition failed" as their own
//! variants so the convergence core can treat them differently from other
//! failures. Rate limiting, server errors and transport errors are retried by
//! [`crate::azure::arm::ArmClient`] before they reach a reconciler.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by a [`crate::azure::CloudClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// The resource does not exist (HTTP 404).
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind, e.g. `loadBalancer`
        kind: String,
        /// Resource name
        name: String,
    },

    /// The resource changed since it was read (HTTP 412).
    #[error("{resource} was modified concurrently, etag no longer matches")]
    Conflict {
        /// Resource name
        resource: String,
    },

    /// The caller is being throttled (HTTP 429).
    #[error("rate limited by the cloud API: {message}")]
    RateLimited {
        /// Error body returned by the API
        message: String,
    },

    /// Server-side failure (HTTP 5xx).
    #[error("cloud API server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error body returned by the API
        message: String,
    },

    /// Any other non-success response.
    #[error("cloud API request failed with {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body returned by the API
        message: String,
    },

    /// The request never completed (connect, timeout, TLS).
    #[error("cloud API transport error: {0}")]
    Transport(String),

    /// A request or response body could not be (de)serialized.
    #[error("failed to (de)serialize cloud resource: {0}")]
    Serialization(String),

    /// The bearer token could not be read.
    #[error("failed to read cloud API token: {0}")]
    Token(String),
}

impl CloudError {
    /// Build a not-found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Map a non-success HTTP response to an error.
    #[must_use]
    pub fn from_status(status: StatusCode, kind: &str, name: &str, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::not_found(kind, name),
            StatusCode::PRECONDITION_FAILED => Self::Conflict {
                resource: name.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { message: body },
            s if s.is_server_error() => Self::Server {
                status: s.as_u16(),
                message: body,
            },
            s => Self::Api {
                status: s.as_u16(),
                message: body,
            },
        }
    }

    /// Whether the error is a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the error is transient and worth retrying with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Transport(_)
        )
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Turn a `NotFound` into `Ok(None)`, keeping every other outcome.
///
/// # Errors
///
/// Returns the original error when it is not a 404.
pub fn ignore_not_found<T>(result: Result<T, CloudError>) -> Result<Option<T>, CloudError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
