// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for Kubernetes and cloud API calls.
//!
//! Transient failures (rate limiting, 5xx, connection errors) are retried with
//! jittered exponential backoff. Everything else, including "not found" and etag
//! conflicts, fails fast so the reconciler can decide what to do.

use crate::azure::CloudError;
use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying Kubernetes calls (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Cloud retry initial interval (50ms)
const CLOUD_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// Cloud retry maximum interval (10 seconds)
const CLOUD_MAX_INTERVAL_SECS: u64 = 10;

/// Cloud retry maximum elapsed time (2 minutes). A reconcile that is still
/// throttled after this goes back to the controller queue.
const CLOUD_MAX_ELAPSED_TIME_SECS: u64 = 120;

/// Exponential backoff with jitter.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API retries.
///
/// Retries at roughly 100ms, 200ms, 400ms, ... capped at 30s, for at most 5 minutes.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff for Azure Resource Manager retries.
///
/// Retries at roughly 50ms, 100ms, 200ms, ... capped at 10s, for at most 2 minutes.
#[must_use]
pub fn cloud_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(CLOUD_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(CLOUD_MAX_INTERVAL_SECS),
        Some(Duration::from_secs(CLOUD_MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Retries HTTP 429, 5xx and connection errors; fails immediately on other errors.
///
/// # Errors
///
/// Returns the first non-retryable error, or a wrapped error once the backoff
/// is exhausted.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client};
/// use kube_egress_gateway::crd::GatewayVMConfiguration;
/// use kube_egress_gateway::reconcilers::retry::retry_api_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<GatewayVMConfiguration> = Api::namespaced(client, "default");
///
/// let vm_config = retry_api_call(
///     || async { api.get_opt("gateway1").await },
///     "get GatewayVMConfiguration gateway1",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    return Err(e.into());
                }

                let Some(duration) = backoff.next_backoff() else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(anyhow::anyhow!(
                        "Backoff exhausted after {attempt} attempts: {e}"
                    ));
                };

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?duration,
                    error = %e,
                    "Retryable Kubernetes API error, will retry"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}

/// Retry a cloud API call with exponential backoff.
///
/// Only [`CloudError::is_retryable`] errors are retried. `NotFound` and
/// `Conflict` are returned untouched so the caller can branch on them.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable error once the
/// backoff is exhausted.
pub async fn retry_cloud_call<T, F, Fut>(
    backoff: &mut ExponentialBackoff,
    mut operation: F,
    operation_name: &str,
) -> Result<T, CloudError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CloudError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Cloud API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => match backoff.next_backoff() {
                Some(duration) => {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable cloud API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                }
                None => {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %e,
                        "Cloud API backoff exhausted, giving up"
                    );
                    return Err(e);
                }
            },
        }
    }
}

/// Whether a Kubernetes error is transient (429, 5xx, connection failure).
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
