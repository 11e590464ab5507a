use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use strata_application::{DEFAULT_POLICY_TIMEOUT, PolicyClient, PolicyRequest};
use strata_core::AppResult;
use strata_domain::{StatusCascade, actions};
use tower::ServiceExt;

use crate::api_services::{RepositorySet, compose_app_state};
use crate::middleware::{DOMAIN_ID_HEADER, SUBJECT_ID_HEADER};

use super::build_router;

const DOMAIN: &str = "domain-1";
const INTERNAL_TOKEN: &str = "peer-secret";

/// Policy double granting a fixed set of `(subject, permission, object)` triples.
struct StaticPolicy {
    grants: HashSet<(String, String, String)>,
}

#[async_trait]
impl PolicyClient for StaticPolicy {
    async fn authorize(&self, request: &PolicyRequest) -> AppResult<bool> {
        Ok(self.grants.contains(&(
            request.subject.clone(),
            request.permission.clone(),
            request.object.clone(),
        )))
    }
}

fn test_router(internal_api_token: Option<&str>) -> Router {
    let policy = StaticPolicy {
        grants: [actions::GROUP_CREATE, actions::CHANNEL_CREATE]
            .into_iter()
            .map(|permission| ("alice".to_owned(), permission.to_owned(), DOMAIN.to_owned()))
            .collect(),
    };
    let state = compose_app_state(
        RepositorySet::in_memory(),
        Arc::new(policy),
        DEFAULT_POLICY_TIMEOUT,
        StatusCascade::TargetOnly,
        internal_api_token.map(str::to_owned),
    );

    build_router(state, Duration::from_secs(5))
}

struct TestResponse {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|error| match error {});
    let status = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    TestResponse {
        status,
        location,
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    }
}

fn user_request(method: &str, uri: &str, subject: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(SUBJECT_ID_HEADER, subject)
        .header(DOMAIN_ID_HEADER, DOMAIN);
    build(builder, body)
}

fn internal_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    build(builder, body)
}

fn build(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.unwrap_or_else(|error| panic!("invalid test request: {error}"))
}

async fn create_group(app: &Router, name: &str, parent_id: Option<&str>) -> String {
    let response = send(
        app,
        user_request(
            "POST",
            "/api/groups",
            "alice",
            Some(json!({ "name": name, "parent_id": parent_id })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    response.body["id"]
        .as_str()
        .map(str::to_owned)
        .unwrap_or_else(|| panic!("group response without id: {}", response.body))
}

#[tokio::test]
async fn health_is_public() {
    let app = test_router(None);
    let response = send(&app, internal_request("GET", "/health", None, None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn requests_without_subject_are_unauthenticated() {
    let app = test_router(None);
    let response = send(&app, internal_request("GET", "/api/groups", None, None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn user_without_domain_is_malformed() {
    let app = test_router(None);
    let request = build(
        Request::builder()
            .method("POST")
            .uri("/api/groups")
            .header(SUBJECT_ID_HEADER, "alice"),
        Some(json!({ "name": "plant-a" })),
    );

    assert_eq!(send(&app, request).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_group_has_location_and_is_visible_to_its_creator_only() {
    let app = test_router(None);
    let response = send(
        &app,
        user_request(
            "POST",
            "/api/groups",
            "alice",
            Some(json!({ "name": "plant-a", "description": "north site" })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let location = response
        .location
        .unwrap_or_else(|| panic!("created group without location"));
    assert_eq!(
        Some(location.as_str()),
        response.body["id"]
            .as_str()
            .map(|id| format!("/api/groups/{id}"))
            .as_deref()
    );

    let viewed = send(&app, user_request("GET", &location, "alice", None)).await;
    assert_eq!(viewed.status, StatusCode::OK);
    assert_eq!(viewed.body["name"], "plant-a");
    assert_eq!(viewed.body["status"], "enabled");

    let denied = send(&app, user_request("GET", &location, "bob", None)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn custom_role_grants_members_its_actions() {
    let app = test_router(None);
    let group_id = create_group(&app, "plant-a", None).await;

    let response = send(
        &app,
        user_request(
            "POST",
            &format!("/api/groups/{group_id}/roles"),
            "alice",
            Some(json!({ "name": "viewer", "actions": ["read"], "members": ["bob"] })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["built_in"], false);
    assert!(response.location.is_some());

    let viewed = send(
        &app,
        user_request("GET", &format!("/api/groups/{group_id}"), "bob", None),
    )
    .await;
    assert_eq!(viewed.status, StatusCode::OK);

    let update = send(
        &app,
        user_request(
            "PATCH",
            &format!("/api/groups/{group_id}"),
            "bob",
            Some(json!({ "name": "renamed" })),
        ),
    )
    .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn available_actions_follow_the_group_catalog() {
    let app = test_router(None);
    let group_id = create_group(&app, "plant-a", None).await;

    let response = send(
        &app,
        user_request(
            "GET",
            &format!("/api/groups/{group_id}/roles/available-actions"),
            "alice",
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let listed: Vec<&str> = response
        .body
        .as_array()
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    assert!(listed.contains(&actions::READ));
    assert!(!listed.contains(&actions::PUBLISH));
}

#[tokio::test]
async fn hierarchy_routes_report_levels_and_reject_cycles() {
    let app = test_router(None);
    let root_id = create_group(&app, "root", None).await;
    let child_id = create_group(&app, "child", Some(&root_id)).await;

    let response = send(
        &app,
        user_request(
            "GET",
            &format!("/api/groups/{root_id}/hierarchy?direction=down&level=0"),
            "alice",
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body[0]["id"], child_id.as_str());
    assert_eq!(response.body[0]["level"], 1);

    let cycle = send(
        &app,
        user_request(
            "POST",
            &format!("/api/groups/{root_id}/parent"),
            "alice",
            Some(json!({ "parent_id": child_id })),
        ),
    )
    .await;
    assert_eq!(cycle.status, StatusCode::CONFLICT);

    let too_deep = send(
        &app,
        user_request(
            "GET",
            &format!("/api/groups/{root_id}/hierarchy?level=21"),
            "alice",
            None,
        ),
    )
    .await;
    assert_eq!(too_deep.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_group_is_gone_for_users_and_peers() {
    let app = test_router(Some(INTERNAL_TOKEN));
    let group_id = create_group(&app, "plant-a", None).await;

    let peer_view = send(
        &app,
        internal_request(
            "GET",
            &format!("/api/internal/groups/{group_id}"),
            Some(INTERNAL_TOKEN),
            None,
        ),
    )
    .await;
    assert_eq!(peer_view.status, StatusCode::OK);
    assert_eq!(peer_view.body["domain_id"], DOMAIN);

    let deleted = send(
        &app,
        user_request("DELETE", &format!("/api/groups/{group_id}"), "alice", None),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let peer_view = send(
        &app,
        internal_request(
            "GET",
            &format!("/api/internal/groups/{group_id}"),
            Some(INTERNAL_TOKEN),
            None,
        ),
    )
    .await;
    assert_eq!(peer_view.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn internal_routes_require_the_shared_token() {
    let body = json!({
        "domain_id": DOMAIN,
        "channel_id": "channel-1",
        "client_id": "client-1",
        "client_type": "client",
        "connection_type": "publish",
    });

    let disabled = test_router(None);
    let response = send(
        &disabled,
        internal_request(
            "POST",
            "/api/internal/channels/authorize",
            Some(INTERNAL_TOKEN),
            Some(body.clone()),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let app = test_router(Some(INTERNAL_TOKEN));
    for token in [None, Some("wrong-secret")] {
        let response = send(
            &app,
            internal_request(
                "POST",
                "/api/internal/channels/authorize",
                token,
                Some(body.clone()),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn client_authorization_follows_channel_connections() {
    let app = test_router(Some(INTERNAL_TOKEN));
    let response = send(
        &app,
        user_request(
            "POST",
            "/api/channels",
            "alice",
            Some(json!({ "name": "telemetry" })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let channel_id = response.body["id"].as_str().unwrap_or_default().to_owned();

    let connected = send(
        &app,
        user_request(
            "POST",
            &format!("/api/channels/{channel_id}/connect"),
            "alice",
            Some(json!({ "client_ids": ["client-1"], "types": ["publish"] })),
        ),
    )
    .await;
    assert_eq!(connected.status, StatusCode::NO_CONTENT);

    let authorize = |connection_type: &str| {
        internal_request(
            "POST",
            "/api/internal/channels/authorize",
            Some(INTERNAL_TOKEN),
            Some(json!({
                "domain_id": DOMAIN,
                "channel_id": channel_id,
                "client_id": "client-1",
                "client_type": "client",
                "connection_type": connection_type,
            })),
        )
    };

    assert_eq!(send(&app, authorize("publish")).await.body["authorized"], true);
    assert_eq!(send(&app, authorize("subscribe")).await.body["authorized"], false);

    let removed = send(
        &app,
        internal_request(
            "DELETE",
            "/api/internal/clients/client-1/connections",
            Some(INTERNAL_TOKEN),
            None,
        ),
    )
    .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    assert_eq!(send(&app, authorize("publish")).await.body["authorized"], false);

    let malformed = send(
        &app,
        internal_request(
            "POST",
            "/api/internal/channels/authorize",
            Some(INTERNAL_TOKEN),
            Some(json!({
                "channel_id": channel_id,
                "client_id": "alice",
                "client_type": "user",
                "connection_type": "publish",
            })),
        ),
    )
    .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}
