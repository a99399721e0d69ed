//! Error types for the Airtable API client.
//!
//! # Design
//! Every failure a caller can observe is a variant of [`Error`], and
//! [`Error::kind`] collapses them into a flat [`ErrorKind`] for matching.
//! Transport backends report through the narrower [`TransportError`], which
//! the request cycle classifies once the URL is known. Envelope shape
//! failures come from the model layer as [`ValidationError`] and are wrapped
//! without modification.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by `ApiClient` construction and resource calls.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value was absent when it was first needed.
    #[error("missing configuration value: {field}")]
    Configuration { field: &'static str },

    /// The client-credentials token exchange failed.
    #[error("authentication failed{}: {message}", fmt_status(.status))]
    Authentication { status: Option<u16>, message: String },

    /// The API answered with a non-2xx status after any eligible retries.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String, body: String },

    /// The host could not be reached.
    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    /// The request exceeded the configured time budget.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Any other request failure (bad URL, protocol error, unreadable body).
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The response body did not match the expected envelope.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Flat categorization of [`Error`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Http,
    Connection,
    Timeout,
    Request,
    Validation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Http { .. } => ErrorKind::Http,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Request { .. } => ErrorKind::Request,
            Error::Validation(_) => ErrorKind::Validation,
        }
    }

    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Authentication { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404) && self.kind() == ErrorKind::Http
    }
}

/// Failures reported by a `Transport` before any status code is available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// DNS failure, refused connection, or broken socket.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("timed out")]
    Timeout,

    /// Anything else: malformed request, protocol violation.
    #[error("{0}")]
    Other(String),
}

/// The response JSON did not conform to the expected envelope.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing required field or wrong JSON type somewhere in the envelope.
    #[error("invalid {entity} envelope: {source}")]
    Shape {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A record carried a `type` tag for a different entity.
    #[error("expected record of type `{expected}`, found `{found}` (id {id})")]
    TypeMismatch {
        expected: &'static str,
        found: String,
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_status_for_http_error() {
        let err = Error::Http {
            status: 404,
            url: "https://api.example/hubs/x".to_string(),
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404 from https://api.example/hubs/x");
    }

    #[test]
    fn authentication_display_includes_status_when_known() {
        let err = Error::Authentication {
            status: Some(401),
            message: "access_denied".to_string(),
        };
        assert_eq!(err.to_string(), "authentication failed (HTTP 401): access_denied");
        assert!(!err.is_not_found());

        let err = Error::Authentication {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "authentication failed: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn validation_error_converts_unchanged() {
        let inner = ValidationError::TypeMismatch {
            expected: "hubs",
            found: "pods".to_string(),
            id: "rec1".to_string(),
        };
        let message = inner.to_string();
        let err: Error = inner.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), message);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn configuration_error_names_the_field() {
        let err = Error::Configuration { field: "api_base_url" };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "missing configuration value: api_base_url");
    }
}
