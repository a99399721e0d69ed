//! OAuth2 client-credentials token exchange.
//!
//! The exchange runs once, while an `ApiClient` is being built. The resulting
//! [`AccessToken`] is held for the client's lifetime and never refreshed; an
//! expired token shows up later as an HTTP 401 from the API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, Transport};

/// An opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Token endpoint for `auth_domain`. A bare domain is served over https.
pub fn token_url(auth_domain: &str) -> String {
    let base = if auth_domain.starts_with("https://") || auth_domain.starts_with("http://") {
        auth_domain.to_string()
    } else {
        format!("https://{auth_domain}")
    };
    format!("{}/oauth/token", base.trim_end_matches('/'))
}

pub(crate) fn build_token_request(settings: &AuthSettings<'_>) -> Result<HttpRequest> {
    let body = serde_json::to_string(&TokenRequest {
        client_id: settings.client_id,
        client_secret: settings.client_secret,
        audience: settings.audience,
        grant_type: "client_credentials",
    })
    .map_err(|e| Error::Authentication {
        status: None,
        message: format!("could not encode token request: {e}"),
    })?;

    Ok(HttpRequest {
        method: HttpMethod::Post,
        url: token_url(settings.auth_domain),
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

/// Exchange client credentials for an access token.
pub(crate) fn acquire_token<T: Transport>(
    transport: &T,
    settings: &AuthSettings<'_>,
) -> Result<AccessToken> {
    let request = build_token_request(settings)?;

    let response = transport.send(&request).map_err(|e| {
        tracing::error!(url = %request.url, error = %e, "token request failed");
        Error::Authentication {
            status: None,
            message: e.to_string(),
        }
    })?;

    let status = Some(response.status);
    if !response.is_success() {
        tracing::error!(url = %request.url, status = response.status, "token request rejected");
        return Err(Error::Authentication {
            status,
            message: response.body,
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(&response.body).map_err(|e| Error::Authentication {
            status,
            message: format!("token response is not valid JSON: {e}"),
        })?;

    match parsed.access_token {
        Some(token) => {
            tracing::debug!(url = %request.url, "acquired access token");
            Ok(AccessToken(token))
        }
        None => {
            tracing::error!(url = %request.url, "token response has no access_token");
            Err(Error::Authentication {
                status,
                message: "response has no access_token".to_string(),
            })
        }
    }
}
