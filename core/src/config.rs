//! Client configuration.
//!
//! # Design
//! `ClientConfig` is a plain value built once at startup, either field by
//! field or from the `WF_AIRTABLE_API_*` environment variables, and passed by
//! reference to `ApiClient::new`. Nothing is validated here: an absent value
//! only becomes an error when the client first needs it.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub const ENV_AUTH0_AUDIENCE: &str = "WF_AIRTABLE_API_AUTH0_AUDIENCE";
pub const ENV_AUTH0_DOMAIN: &str = "WF_AIRTABLE_API_AUTH0_DOMAIN";
pub const ENV_AUTH0_CLIENT_ID: &str = "WF_AIRTABLE_API_AUTH0_CLIENT_ID";
pub const ENV_AUTH0_CLIENT_SECRET: &str = "WF_AIRTABLE_API_AUTH0_CLIENT_SECRET";
pub const ENV_API_URL: &str = "WF_AIRTABLE_API_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection and credential settings for an `ApiClient`.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    pub audience: Option<String>,
    pub auth_domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: Option<String>,
    /// Budget for each individual attempt, connect through body.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            audience: None,
            auth_domain: None,
            client_id: None,
            client_secret: None,
            api_base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// An empty configuration: every credential absent, default timeout and retry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `WF_AIRTABLE_API_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            audience: get(ENV_AUTH0_AUDIENCE),
            auth_domain: get(ENV_AUTH0_DOMAIN),
            client_id: get(ENV_AUTH0_CLIENT_ID),
            client_secret: get(ENV_AUTH0_CLIENT_SECRET),
            api_base_url: get(ENV_API_URL),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    #[must_use]
    pub fn with_auth_domain(mut self, auth_domain: impl Into<String>) -> Self {
        self.auth_domain = Some(auth_domain.into());
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(api_base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Borrow the token-exchange settings, failing on the first absent one.
    pub(crate) fn auth_settings(&self) -> Result<AuthSettings<'_>> {
        Ok(AuthSettings {
            auth_domain: require(&self.auth_domain, "auth_domain")?,
            client_id: require(&self.client_id, "client_id")?,
            client_secret: require(&self.client_secret, "client_secret")?,
            audience: require(&self.audience, "audience")?,
        })
    }
}

fn require<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str> {
    value.as_deref().ok_or(Error::Configuration { field })
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("audience", &self.audience)
            .field("auth_domain", &self.auth_domain)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Credentials for one client-credentials exchange.
#[derive(Clone, Copy)]
pub(crate) struct AuthSettings<'a> {
    pub auth_domain: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub audience: &'a str,
}
