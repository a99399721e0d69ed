//! The authenticated request cycle.
//!
//! # Design
//! `ApiClient` owns a transport, the API base URL, and the access token
//! obtained during construction. It has no `&mut self` methods, so one
//! instance can be shared across threads. Every resource call goes through
//! [`ApiClient::get`]: `build_get` produces the `HttpRequest` (pure, no I/O),
//! the transport executes it, and the response is classified here. Failures
//! are logged with the URL and status before being returned unchanged.

use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{self, AccessToken};
use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::retry::RetryingTransport;
use crate::types::Validate;

/// The transport used by [`ApiClient::new`].
pub type DefaultTransport = RetryingTransport<UreqTransport>;

/// Blocking client for the Wildflower Airtable API.
#[derive(Debug, Clone)]
pub struct ApiClient<T = DefaultTransport> {
    transport: T,
    api_base_url: Option<String>,
    access_token: AccessToken,
}

impl ApiClient<DefaultTransport> {
    /// Build the retrying `ureq` transport from `config` and authenticate.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = RetryingTransport::new(UreqTransport::new(config.timeout), config.retry.clone());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Authenticate through `transport` and keep it for all later calls.
    ///
    /// `transport` is used as-is; wrap it in a `RetryingTransport` to get
    /// automatic retry.
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self> {
        let settings = config.auth_settings()?;
        let access_token = auth::acquire_token(&transport, &settings)?;
        Ok(Self::with_token(config, transport, access_token))
    }

    /// Use an already issued token instead of performing the exchange.
    pub fn with_token(config: &ClientConfig, transport: T, access_token: AccessToken) -> Self {
        Self {
            transport,
            api_base_url: config
                .api_base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            access_token,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Describe a GET of `{api_base_url}/{path}` with `params` as the query string.
    ///
    /// Each `/`-separated segment of `path` is percent-encoded, so record ids
    /// with spaces, `#`, `?`, or non-ASCII characters reach the server intact.
    pub fn build_get(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest> {
        let base = self
            .api_base_url
            .as_deref()
            .ok_or(Error::Configuration { field: "api_base_url" })?;
        let invalid = |message: String| Error::Request {
            url: format!("{base}/{path}"),
            message,
        };

        let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), self.access_token.bearer()),
            ],
            body: None,
        })
    }

    /// Issue an authenticated GET and return the decoded JSON body.
    pub fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let request = self.build_get(path, params).inspect_err(|err| {
            tracing::error!(path, error = %err, "could not build request");
        })?;
        tracing::debug!(url = %request.url, "GET");

        let outcome = self.transport.send(&request);
        parse_json(&request.url, outcome).inspect_err(|err| {
            tracing::error!(url = %request.url, status = err.status(), error = %err, "request failed");
        })
    }

    /// [`ApiClient::get`] followed by envelope validation.
    pub fn get_as<E>(&self, path: &str, params: &[(&str, &str)]) -> Result<E>
    where
        E: Validate + DeserializeOwned,
    {
        let value = self.get(path, params)?;
        E::parse(value).map_err(|err| {
            tracing::error!(path, error = %err, "response failed validation");
            Error::from(err)
        })
    }
}

/// Classify a transport outcome and decode a successful body.
fn parse_json(
    url: &str,
    outcome: Result<HttpResponse, TransportError>,
) -> Result<serde_json::Value> {
    let response = outcome.map_err(|err| match err {
        TransportError::Connection(message) => Error::Connection {
            url: url.to_string(),
            message,
        },
        TransportError::Timeout => Error::Timeout {
            url: url.to_string(),
        },
        TransportError::Other(message) => Error::Request {
            url: url.to_string(),
            message,
        },
    })?;

    if !response.is_success() {
        return Err(Error::Http {
            status: response.status,
            url: url.to_string(),
            body: response.body,
        });
    }

    serde_json::from_str(&response.body).map_err(|e| Error::Request {
        url: url.to_string(),
        message: format!("response body is not valid JSON: {e}"),
    })
}
