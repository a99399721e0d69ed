//! Blocking, typed client for the Wildflower Airtable API.
//!
//! # Overview
//! `ApiClient` authenticates once with an OAuth2 client-credentials grant,
//! then serves read-only calls (hubs, pods, partners, schools, educators,
//! location contacts) as validated envelopes.
//!
//! # Design
//! - `ClientConfig` is explicit; `ClientConfig::from_env` is the only place
//!   the `WF_AIRTABLE_API_*` variables are read.
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`)
//!   passed through the `Transport` trait. The default transport is a pooled
//!   `ureq` agent wrapped in `RetryingTransport`, which re-issues idempotent
//!   requests on 429/500/502/503/504 up to three attempts in total.
//! - Every failure is an `Error` variant; `Error::kind` gives a flat
//!   category to branch on.
//!
//! ```no_run
//! use wf_airtable_api_client::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(&ClientConfig::from_env())?;
//! for hub in client.list_hubs()?.iter() {
//!     println!("{} {}", hub.id, hub.fields.name);
//! }
//! # Ok::<(), wf_airtable_api_client::Error>(())
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
mod resources;
pub mod retry;
pub mod types;

#[cfg(test)]
mod mock;

pub use auth::AccessToken;
pub use client::{ApiClient, DefaultTransport};
pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Result, TransportError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use retry::{RetryPolicy, RetryingTransport};
pub use types::{
    Educator, Envelope, Hub, ListEnvelope, LocationContact, Partner, Pod, Record, Relationship,
    RelationshipData, Resource, ResourceIdentifier, School, Validate,
};
