use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use strata_application::{PolicyClient, PolicyRequest};
use strata_core::{AppError, DomainId, SubjectKind};
use strata_domain::EntityKind;
use tokio::sync::Mutex;
use url::Url;

use super::HttpPolicyClient;

struct ScriptedPolicyService {
    calls: AtomicUsize,
    responses: Vec<(StatusCode, bool)>,
    last_body: Mutex<Option<Value>>,
}

async fn authorize(
    State(service): State<Arc<ScriptedPolicyService>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let call = service.calls.fetch_add(1, Ordering::SeqCst);
    *service.last_body.lock().await = Some(body);
    let index = call.min(service.responses.len().saturating_sub(1));
    let (status, authorized) = service.responses[index];
    (status, Json(json!({ "authorized": authorized })))
}

async fn spawn_service(responses: Vec<(StatusCode, bool)>) -> (Url, Arc<ScriptedPolicyService>) {
    let service = Arc::new(ScriptedPolicyService {
        calls: AtomicUsize::new(0),
        responses,
        last_body: Mutex::new(None),
    });
    let app = Router::new()
        .route("/policy/authorize", post(authorize))
        .with_state(service.clone());

    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) => panic!("failed to bind policy test listener: {error}"),
    };
    let address = match listener.local_addr() {
        Ok(address) => address,
        Err(error) => panic!("failed to read policy test address: {error}"),
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let base_url = Url::parse(format!("http://{address}/policy").as_str())
        .unwrap_or_else(|_| unreachable!());
    (base_url, service)
}

fn client(base_url: &Url, max_attempts: u8) -> HttpPolicyClient {
    let http_client = HttpPolicyClient::build_http_client(Duration::from_secs(2))
        .unwrap_or_else(|_| unreachable!());
    HttpPolicyClient::new(http_client, base_url, max_attempts, 1).unwrap_or_else(|_| unreachable!())
}

fn request() -> PolicyRequest {
    PolicyRequest {
        subject: "user-1".to_owned(),
        subject_kind: SubjectKind::User,
        permission: "update_permission".to_owned(),
        object: "group-1".to_owned(),
        object_kind: EntityKind::Group,
        domain: Some(DomainId::new("d1").unwrap_or_else(|_| unreachable!())),
    }
}

#[tokio::test]
async fn denial_is_returned_without_retry() {
    let (base_url, service) = spawn_service(vec![(StatusCode::OK, false)]).await;

    let decision = client(&base_url, 3).authorize(&request()).await;

    assert!(matches!(decision, Ok(false)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    let body = service.last_body.lock().await.clone().unwrap_or_default();
    assert_eq!(body["subject_type"], "user");
    assert_eq!(body["object_type"], "group");
    assert_eq!(body["domain"], "d1");
}

#[tokio::test]
async fn transient_statuses_are_retried() {
    let (base_url, service) = spawn_service(vec![
        (StatusCode::SERVICE_UNAVAILABLE, false),
        (StatusCode::TOO_MANY_REQUESTS, false),
        (StatusCode::OK, true),
    ])
    .await;

    let decision = client(&base_url, 3).authorize(&request()).await;

    assert!(matches!(decision, Ok(true)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_are_internal_errors() {
    let (base_url, service) =
        spawn_service(vec![(StatusCode::INTERNAL_SERVER_ERROR, true)]).await;

    let decision = client(&base_url, 2).authorize(&request()).await;

    assert!(matches!(decision, Err(AppError::Internal(_))));
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (base_url, service) = spawn_service(vec![(StatusCode::BAD_REQUEST, true)]).await;

    let decision = client(&base_url, 3).authorize(&request()).await;

    assert!(matches!(decision, Err(AppError::Internal(_))));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}
