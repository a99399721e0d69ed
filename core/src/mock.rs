//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Replays queued outcomes in order and records every request it sees.
///
/// Running out of scripted outcomes is a test bug and yields an `Other`
/// error naming the unexpected request.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub(crate) fn push_status(&self, status: u16, body: &str) {
        self.push_response(Self::response(status, body));
    }

    pub(crate) fn push_json(&self, body: serde_json::Value) {
        self.push_response(
            Self::response(200, &body.to_string()).with_header("content-type", "application/json"),
        );
    }

    pub(crate) fn push_response(&self, response: HttpResponse) {
        self.outcomes.lock().unwrap().push_back(Ok(response));
    }

    pub(crate) fn push_error(&self, err: TransportError) {
        self.outcomes.lock().unwrap().push_back(Err(err));
    }

    /// Queue a successful token exchange returning `token`.
    pub(crate) fn push_token(&self, token: &str) {
        self.push_json(serde_json::json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": 86400,
        }));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Other(format!(
                    "no scripted response for {} {}",
                    request.method, request.url
                )))
            })
    }
}
