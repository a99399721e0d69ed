use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const CLIENT_ID: &str = "mock-client-id";
pub const CLIENT_SECRET: &str = "mock-client-secret";
pub const AUDIENCE: &str = "https://airtable-api.mock";
pub const ACCESS_TOKEN: &str = "mock-access-token";

/// Id of the contact returned when no location matches an address.
pub const DEFAULT_CONTACT_ID: &str = "recLcDefault";

type Reply = (StatusCode, Json<Value>);

/// Shared server state: seeded tables plus test hooks.
#[derive(Debug)]
pub struct MockState {
    tables: BTreeMap<&'static str, Vec<Value>>,
    failures: Mutex<VecDeque<StatusCode>>,
    api_requests: AtomicUsize,
    token_requests: AtomicUsize,
    addresses: Mutex<Vec<String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        Self {
            tables: seed(),
            failures: Mutex::new(VecDeque::new()),
            api_requests: AtomicUsize::new(0),
            token_requests: AtomicUsize::new(0),
            addresses: Mutex::new(Vec::new()),
        }
    }

    /// Answer the next `count` requests (token or API) with `status`.
    pub fn fail_next(&self, status: u16, count: usize) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut failures = lock(&self.failures);
        failures.extend(std::iter::repeat(status).take(count));
    }

    /// Resource requests received, including injected failures.
    pub fn api_requests(&self) -> usize {
        self.api_requests.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// Decoded `address` values seen by `contact_for_address`, in order.
    pub fn addresses(&self) -> Vec<String> {
        lock(&self.addresses).clone()
    }

    fn take_failure(&self) -> Option<Reply> {
        lock(&self.failures)
            .pop_front()
            .map(|status| error(status, "injected failure"))
    }

    fn table(&self, kind: &str) -> &[Value] {
        self.tables.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn find(&self, kind: &str, id: &str) -> Option<&Value> {
        self.table(kind).iter().find(|r| r["id"] == id)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::new()))
}

pub fn app_with_state(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/oauth/token", post(issue_token))
        .route("/hubs", get(list_hubs))
        .route("/hubs/{id}", get(get_hub))
        .route(
            "/hubs/{id}/regional_site_entrepreneurs",
            get(hub_regional_site_entrepreneurs),
        )
        .route("/hubs/{id}/pods", get(hub_pods))
        .route("/hubs/{id}/schools", get(hub_schools))
        .route("/pods", get(list_pods))
        .route("/pods/{id}", get(get_pod))
        .route("/partners", get(list_partners))
        .route("/partners/{id}", get(get_partner))
        .route("/schools", get(list_schools))
        .route("/schools/{id}", get(get_school))
        .route("/educators", get(list_educators))
        .route("/educators/{id}", get(get_educator))
        .route("/location_contacts", get(list_location_contacts))
        .route(
            "/location_contacts/contact_for_address",
            get(contact_for_address),
        )
        .route("/location_contacts/{id}", get(get_location_contact))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: Arc<MockState>) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock airtable api listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    pub grant_type: String,
}

async fn issue_token(State(state): State<Arc<MockState>>, Json(input): Json<TokenRequest>) -> Reply {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(reply) = state.take_failure() {
        return reply;
    }
    if input.grant_type != "client_credentials" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        );
    }
    if input.client_id != CLIENT_ID || input.client_secret != CLIENT_SECRET || input.audience != AUDIENCE {
        tracing::warn!(client_id = %input.client_id, "rejected client credentials");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "access_denied", "error_description": "Unauthorized"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 86400,
        })),
    )
}

/// Count the request, apply injected failures, and check the bearer token.
fn gate(state: &MockState, headers: &HeaderMap) -> Result<(), Reply> {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(reply) = state.take_failure() {
        return Err(reply);
    }
    let expected = format!("Bearer {ACCESS_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "missing or invalid bearer token")),
    }
}

fn error(status: StatusCode, detail: &str) -> Reply {
    (status, Json(json!({"detail": detail})))
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

fn single(state: &MockState, headers: &HeaderMap, kind: &str, id: &str) -> Reply {
    if let Err(reply) = gate(state, headers) {
        return reply;
    }
    match state.find(kind, id) {
        Some(record) => (
            StatusCode::OK,
            Json(json!({"data": record, "links": {"self": format!("/{kind}/{id}")}})),
        ),
        None => error(StatusCode::NOT_FOUND, &format!("{kind} {id} not found")),
    }
}

fn list(state: &MockState, headers: &HeaderMap, kind: &str) -> Reply {
    if let Err(reply) = gate(state, headers) {
        return reply;
    }
    list_body(state.table(kind).to_vec(), &format!("/{kind}"))
}

fn list_body(records: Vec<Value>, self_link: &str) -> Reply {
    let count = records.len();
    (
        StatusCode::OK,
        Json(json!({"data": records, "links": {"self": self_link}, "meta": {"count": count}})),
    )
}

/// Records of `kind` linked from hub `id` under `relationship`.
fn hub_related(
    state: &MockState,
    headers: &HeaderMap,
    id: &str,
    relationship: &str,
    kind: &str,
) -> Reply {
    if let Err(reply) = gate(state, headers) {
        return reply;
    }
    let Some(hub) = state.find("hubs", id) else {
        return error(StatusCode::NOT_FOUND, &format!("hubs {id} not found"));
    };
    let ids: Vec<&str> = hub["relationships"][relationship]["data"]
        .as_array()
        .map(|idents| idents.iter().filter_map(|i| i["id"].as_str()).collect())
        .unwrap_or_default();
    let records = ids
        .into_iter()
        .filter_map(|rid| state.find(kind, rid).cloned())
        .collect();
    list_body(records, &format!("/hubs/{id}/{relationship}"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Shared = State<Arc<MockState>>;

async fn list_hubs(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "hubs")
}

async fn get_hub(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    single(&state, &headers, "hubs", &id)
}

async fn hub_regional_site_entrepreneurs(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    hub_related(&state, &headers, &id, "regional_site_entrepreneurs", "partners")
}

async fn hub_pods(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    hub_related(&state, &headers, &id, "pods", "pods")
}

async fn hub_schools(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    hub_related(&state, &headers, &id, "schools", "schools")
}

async fn list_pods(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "pods")
}

async fn get_pod(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    single(&state, &headers, "pods", &id)
}

async fn list_partners(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "partners")
}

async fn get_partner(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    single(&state, &headers, "partners", &id)
}

async fn list_schools(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "schools")
}

async fn get_school(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    single(&state, &headers, "schools", &id)
}

async fn list_educators(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "educators")
}

async fn get_educator(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    single(&state, &headers, "educators", &id)
}

async fn list_location_contacts(State(state): Shared, headers: HeaderMap) -> Reply {
    list(&state, &headers, "location_contacts")
}

async fn get_location_contact(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    single(&state, &headers, "location_contacts", &id)
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

/// The contact whose `location` appears in the address, else the default contact.
async fn contact_for_address(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<AddressQuery>,
) -> Reply {
    if let Err(reply) = gate(&state, &headers) {
        return reply;
    }
    lock(&state.addresses).push(query.address.clone());

    let needle = query.address.to_lowercase();
    let contacts = state.table("location_contacts");
    let matched = contacts
        .iter()
        .filter(|c| c["id"] != DEFAULT_CONTACT_ID)
        .find(|c| {
            c["fields"]["location"]
                .as_str()
                .is_some_and(|loc| needle.contains(&loc.to_lowercase()))
        })
        .or_else(|| state.find("location_contacts", DEFAULT_CONTACT_ID));

    match matched {
        Some(record) => (StatusCode::OK, Json(json!({"data": record}))),
        None => error(StatusCode::NOT_FOUND, "no contact for address"),
    }
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

fn record(kind: &str, id: &str, fields: Value, relationships: Value) -> Value {
    let mut record = json!({
        "id": id,
        "type": kind,
        "fields": fields,
        "links": {"self": format!("/{kind}/{id}")},
    });
    if relationships.as_object().is_some_and(|r| !r.is_empty()) {
        record["relationships"] = relationships;
    }
    record
}

fn to_many(kind: &str, ids: &[&str]) -> Value {
    let data: Vec<Value> = ids.iter().map(|id| json!({"id": id, "type": kind})).collect();
    json!({"data": data})
}

fn seed() -> BTreeMap<&'static str, Vec<Value>> {
    let mut tables = BTreeMap::new();

    tables.insert(
        "hubs",
        vec![
            record(
                "hubs",
                "recHubGreatLakes",
                json!({"name": "Great Lakes"}),
                json!({
                    "regional_site_entrepreneurs": to_many("partners", &["recPartnerAda"]),
                    "pods": to_many("pods", &["recPodChicago", "recPodDetroit"]),
                    "schools": to_many("schools", &["recSchoolAcorn", "recSchoolBirch"]),
                }),
            ),
            record("hubs", "recHubNewYork", json!({"name": "New York"}), json!({})),
        ],
    );

    tables.insert(
        "pods",
        vec![
            record("pods", "recPodChicago", json!({"name": "Chicago"}), json!({})),
            record("pods", "recPodDetroit", json!({"name": "Detroit"}), json!({})),
        ],
    );

    tables.insert(
        "partners",
        vec![
            record(
                "partners",
                "recPartnerAda",
                json!({
                    "name": "Ada Lovelace",
                    "email": "ada@wildflowerschools.example",
                    "active": true,
                    "roles": ["Regional Site Entrepreneur"],
                }),
                json!({}),
            ),
            record(
                "partners",
                "recPartnerGrace",
                json!({"name": "Grace Hopper", "active": false}),
                json!({}),
            ),
        ],
    );

    tables.insert(
        "schools",
        vec![
            record(
                "schools",
                "recSchoolAcorn",
                json!({
                    "name": "Acorn Montessori",
                    "short_name": "Acorn",
                    "status": "Open",
                    "ages_served": ["Primary"],
                }),
                json!({}),
            ),
            record(
                "schools",
                "recSchoolBirch",
                json!({"name": "Birch Montessori", "status": "Emerging"}),
                json!({}),
            ),
        ],
    );

    tables.insert(
        "educators",
        vec![
            record(
                "educators",
                "recEducatorMaria",
                json!({
                    "full_name": "Maria Montessori",
                    "first_name": "Maria",
                    "last_name": "Montessori",
                }),
                json!({}),
            ),
            record(
                "educators",
                "recEducatorJohn",
                json!({"full_name": "John Dewey", "email": "john@example.org"}),
                json!({}),
            ),
        ],
    );

    tables.insert(
        "location_contacts",
        vec![
            record(
                "location_contacts",
                "recLcChicago",
                json!({
                    "location": "Chicago",
                    "location_type": "City",
                    "latitude": 41.8781,
                    "longitude": -87.6298,
                    "assigned_rse_name": "Ada Lovelace",
                    "hub_name": "Great Lakes",
                }),
                json!({}),
            ),
            record(
                "location_contacts",
                DEFAULT_CONTACT_ID,
                json!({"location": "Default", "location_type": "Default"}),
                json!({}),
            ),
        ],
    );

    tables
}
