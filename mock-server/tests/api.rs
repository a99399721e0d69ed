use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, MockState, ACCESS_TOKEN, AUDIENCE, CLIENT_ID, CLIENT_SECRET};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn token_request(body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/oauth/token")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn authed_get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {ACCESS_TOKEN}"))
        .body(String::new())
        .unwrap()
}

fn valid_credentials() -> String {
    serde_json::json!({
        "client_id": CLIENT_ID,
        "client_secret": CLIENT_SECRET,
        "audience": AUDIENCE,
        "grant_type": "client_credentials",
    })
    .to_string()
}

// --- token ---

#[tokio::test]
async fn token_issued_for_valid_credentials() {
    let resp = app().oneshot(token_request(&valid_credentials())).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["access_token"], ACCESS_TOKEN);
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
async fn token_rejected_for_wrong_secret() {
    let body = valid_credentials().replace(CLIENT_SECRET, "wrong");
    let resp = app().oneshot(token_request(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "access_denied");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn token_rejected_for_other_grant_type() {
    let body = valid_credentials().replace("client_credentials", "password");
    let resp = app().oneshot(token_request(&body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_request_missing_fields_returns_422() {
    let resp = app()
        .oneshot(token_request(r#"{"client_id":"only"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- auth gate ---

#[tokio::test]
async fn resources_require_bearer_token() {
    let resp = app()
        .oneshot(Request::builder().uri("/hubs").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_bearer_token_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/pods")
                .header(http::header::AUTHORIZATION, "Bearer stale")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- resources ---

#[tokio::test]
async fn list_hubs_returns_list_envelope() {
    let resp = app().oneshot(authed_get("/hubs")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|r| r["type"] == "hubs"));
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(body["links"]["self"], "/hubs");
}

#[tokio::test]
async fn get_hub_returns_single_envelope() {
    let resp = app().oneshot(authed_get("/hubs/recHubGreatLakes")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], "recHubGreatLakes");
    assert_eq!(body["data"]["fields"]["name"], "Great Lakes");
}

#[tokio::test]
async fn unknown_id_returns_404() {
    let resp = app().oneshot(authed_get("/hubs/nonexistent")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hub_pods_follow_relationships() {
    let resp = app()
        .oneshot(authed_get("/hubs/recHubGreatLakes/pods"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["recPodChicago", "recPodDetroit"]);
}

#[tokio::test]
async fn hub_without_links_has_empty_listings() {
    let resp = app()
        .oneshot(authed_get("/hubs/recHubNewYork/regional_site_entrepreneurs"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn contact_for_address_matches_location() {
    let state = Arc::new(MockState::new());
    let resp = app_with_state(state.clone())
        .oneshot(authed_get(
            "/location_contacts/contact_for_address?address=1+Wacker+Dr%2C+Chicago%2C+IL",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], "recLcChicago");
    assert_eq!(state.addresses(), vec!["1 Wacker Dr, Chicago, IL".to_string()]);
}

#[tokio::test]
async fn contact_for_unknown_address_falls_back_to_default() {
    let resp = app()
        .oneshot(authed_get(
            "/location_contacts/contact_for_address?address=123%20Main%20St",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["id"], mock_server::DEFAULT_CONTACT_ID);
}

#[tokio::test]
async fn contact_for_address_requires_address() {
    let resp = app()
        .oneshot(authed_get("/location_contacts/contact_for_address"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- failure injection ---

#[tokio::test]
async fn injected_failures_precede_normal_handling() {
    use tower::Service;

    let state = Arc::new(MockState::new());
    state.fail_next(503, 1);
    let mut app = app_with_state(state.clone()).into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed_get("/pods"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed_get("/pods"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.api_requests(), 2);
    assert_eq!(state.token_requests(), 0);
}
