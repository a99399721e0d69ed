//! Bounded automatic retry for idempotent requests.
//!
//! [`RetryingTransport`] wraps any [`Transport`] and re-issues a request when
//! the response status is transient or the attempt failed before a response
//! arrived. Only methods listed in [`RetryPolicy::allowed_methods`] are ever
//! retried, so the token exchange (a POST) always runs once. Callers never see
//! intermediate attempts: they get the final response or the final error.

use std::thread;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Statuses treated as transient.
pub const DEFAULT_STATUS_FORCELIST: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses whose `Retry-After` header is honored.
pub const DEFAULT_RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Methods safe to re-issue.
pub const DEFAULT_ALLOWED_METHODS: [HttpMethod; 3] =
    [HttpMethod::Head, HttpMethod::Get, HttpMethod::Options];

/// Retry behavior for [`RetryingTransport`].
///
/// ## Default Values
///
/// - `max_attempts`: 3 (the first try plus two retries)
/// - `backoff_factor`: 0.2s, doubling per retry (0.2s, 0.4s, 0.8s, ...)
/// - `status_forcelist`: 429, 500, 502, 503, 504
/// - `allowed_methods`: HEAD, GET, OPTIONS
/// - `respect_retry_after`: true for 413, 429, 503, capped at `max_backoff` (120s)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retry.
    pub max_attempts: u32,

    /// Base delay in seconds for exponential backoff.
    pub backoff_factor: f64,

    /// Upper bound for any single delay.
    pub max_backoff: Duration,

    pub status_forcelist: Vec<u16>,

    pub allowed_methods: Vec<HttpMethod>,

    /// Use an integer `Retry-After` header instead of the computed delay.
    pub respect_retry_after: bool,

    /// Statuses for which `Retry-After` applies. Others always back off.
    pub retry_after_statuses: Vec<u16>,

    pub retry_on_connection_error: bool,

    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 0.2,
            max_backoff: Duration::from_secs(120),
            status_forcelist: DEFAULT_STATUS_FORCELIST.to_vec(),
            allowed_methods: DEFAULT_ALLOWED_METHODS.to_vec(),
            respect_retry_after: true,
            retry_after_statuses: DEFAULT_RETRY_AFTER_STATUSES.to_vec(),
            retry_on_connection_error: true,
            retry_on_timeout: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor.max(0.0);
        self
    }

    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    #[must_use]
    pub fn with_status_forcelist(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.status_forcelist = statuses.into();
        self
    }

    #[must_use]
    pub fn with_allowed_methods(mut self, methods: impl Into<Vec<HttpMethod>>) -> Self {
        self.allowed_methods = methods.into();
        self
    }

    #[must_use]
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    #[must_use]
    pub fn with_retry_after_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retry_after_statuses = statuses.into();
        self
    }

    #[must_use]
    pub fn with_retry_on_connection_error(mut self, retry: bool) -> Self {
        self.retry_on_connection_error = retry;
        self
    }

    #[must_use]
    pub fn with_retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_on_timeout = retry;
        self
    }

    pub fn is_method_allowed(&self, method: HttpMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    fn should_retry_error(&self, err: &TransportError) -> bool {
        match err {
            TransportError::Connection(_) => self.retry_on_connection_error,
            TransportError::Timeout => self.retry_on_timeout,
            TransportError::Other(_) => false,
        }
    }

    /// Delay before retry number `retry` (1-based): `backoff_factor * 2^(retry-1)`,
    /// capped at `max_backoff`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry as i32 - 1);
        if secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }

    fn delay_after(&self, response: &HttpResponse, retry: u32) -> Duration {
        if self.respect_retry_after && self.retry_after_statuses.contains(&response.status) {
            if let Some(secs) = response
                .header("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok())
            {
                return Duration::from_secs(secs).min(self.max_backoff);
            }
        }
        self.delay_for_retry(retry)
    }
}

/// A [`Transport`] that applies a [`RetryPolicy`] beneath `send`.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for RetryingTransport<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let retryable_method = self.policy.is_method_allowed(request.method);
        let mut attempt = 1;

        loop {
            let outcome = self.inner.send(request);
            let exhausted = !retryable_method || attempt >= self.policy.max_attempts;

            let delay = match &outcome {
                Ok(response) if !exhausted && self.policy.should_retry_status(response.status) => {
                    Some(self.policy.delay_after(response, attempt))
                }
                Err(err) if !exhausted && self.policy.should_retry_error(err) => {
                    Some(self.policy.delay_for_retry(attempt))
                }
                _ => None,
            };
            let Some(delay) = delay else {
                return outcome;
            };

            tracing::warn!(
                method = %request.method,
                url = %request.url,
                attempt,
                status = outcome.as_ref().ok().map(|r| r.status),
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}
