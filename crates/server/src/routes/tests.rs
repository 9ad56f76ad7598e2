//! Router tests over the in-memory store and image host.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use orbit_core::SubmissionId;

use crate::config::{AdminConfig, CloudinaryConfig, ServerConfig};
use crate::db::{MemorySubmissionStore, RepositoryError, SubmissionStore};
use crate::models::{NewSubmission, Submission};
use crate::services::auth::hash_password;
use crate::services::images::MemoryImageHost;
use crate::state::AppState;

const BOUNDARY: &str = "orbit-test-boundary";
const PASSWORD: &str = "correct horse battery staple";

fn config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        frontend_url: "http://localhost:5173".to_string(),
        cookie_secure: true,
        uploads_per_hour: NonZeroU32::new(3).unwrap(),
        admin: AdminConfig {
            username: "root".to_string(),
            password_hash: SecretString::from(hash_password(PASSWORD).unwrap()),
            jwt_secret: SecretString::from("Zq8#vN2!mK5@xR7$pL4^tW9&bH3*cJ6e"),
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from("unused"),
            folder: "orbit_users".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

struct Harness {
    app: Router,
    state: AppState,
    store: Arc<MemorySubmissionStore>,
    images: Arc<MemoryImageHost>,
}

fn harness() -> Harness {
    let store = Arc::new(MemorySubmissionStore::new());
    let images = Arc::new(MemoryImageHost::new());
    let state = AppState::new(config(), store.clone(), images.clone());
    let app = super::app(state.clone()).unwrap();
    Harness {
        app,
        state,
        store,
        images,
    }
}

fn multipart_body(name: Option<&str>, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(name) = name {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn connect_request(name: Option<&str>, image: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/connect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::from(multipart_body(name, image)))
        .unwrap()
}

fn png() -> Option<(&'static str, &'static [u8])> {
    Some(("image/png", b"\x89PNG\r\n\x1a\nfake"))
}

fn admin_request(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn token(state: &AppState) -> String {
    state.gateway().login("root", PASSWORD).unwrap().token
}

async fn seed(store: &MemorySubmissionStore, images: &MemoryImageHost, name: &str) -> Submission {
    use crate::services::images::{ImageHost, ImageUpload};

    let hosted = images
        .upload(ImageUpload {
            bytes: vec![1, 2, 3],
            file_name: None,
            content_type: "image/png".to_string(),
        })
        .await
        .unwrap();
    store
        .create(NewSubmission {
            name: orbit_core::DisplayName::parse(name).unwrap(),
            image_url: hosted.url,
        })
        .await
        .unwrap()
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_connect_creates_pending_submission() {
    let h = harness();

    let response = send(&h.app, connect_request(Some("  Ada  "), png())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Signal Transmitted");
    let id = SubmissionId::parse(body["nodeId"].as_str().unwrap()).unwrap();

    let stored = h.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.name.as_str(), "Ada");
    assert_eq!(h.images.len().await, 1);

    let users = Request::get("/api/users").body(Body::empty()).unwrap();
    let users = json_body(send(&h.app, users).await).await;
    assert_eq!(users, Value::Array(vec![]));
}

#[tokio::test]
async fn test_connect_validation_errors_upload_nothing() {
    let h = harness();
    let long_name = "x".repeat(51);

    let cases = [
        (connect_request(Some("Ada"), None), "No node asset detected. Please upload a photo!"),
        (connect_request(None, png()), "Identity signature required. Please provide a name."),
        (
            connect_request(Some("   "), png()),
            "Identity signature required. Please provide a name.",
        ),
        (connect_request(Some(&long_name), png()), "Name is too long. Max 50 characters."),
        (
            connect_request(Some("Ada"), Some(("text/html", b"<script>"))),
            "Only images are allowed!",
        ),
    ];

    for (i, (mut request, expected)) in cases.into_iter().enumerate() {
        // Separate clients so the upload quota doesn't interfere.
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("198.51.100.{i}").parse().unwrap());
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], expected);
    }

    assert!(h.images.is_empty().await);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_connect_accepts_fifty_character_name() {
    let h = harness();
    let name = "y".repeat(50);

    let response = send(&h.app, connect_request(Some(&name), png())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_connect_rejects_oversized_image() {
    let h = harness();
    let big = vec![0u8; super::MAX_IMAGE_BYTES + 1];

    let response = send(&h.app, connect_request(Some("Ada"), Some(("image/png", &big)))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(h.images.is_empty().await);
}

#[tokio::test]
async fn test_connect_rejects_non_multipart() {
    let h = harness();
    let request = Request::post("/api/connect")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Ada"}"#))
        .unwrap();

    let response = send(&h.app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fourth_upload_in_an_hour_is_rate_limited() {
    let h = harness();

    for _ in 0..3 {
        let response = send(&h.app, connect_request(Some("Ada"), png())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&h.app, connect_request(Some("Ada"), png())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        json_body(response).await["message"],
        "Upload quota exceeded. Please try again in an hour."
    );
    assert_eq!(h.store.len().await, 3);

    // Another client still has its own quota.
    let mut other = connect_request(Some("Grace"), png());
    other
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.20".parse().unwrap());
    assert_eq!(send(&h.app, other).await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_users_lists_only_approved() {
    let h = harness();
    let ada = seed(&h.store, &h.images, "Ada").await;
    seed(&h.store, &h.images, "Grace").await;
    h.store.approve(ada.id).await.unwrap();

    let response = send(&h.app, Request::get("/api/users").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], "Ada");
    assert_eq!(users[0]["status"], "approved");
    assert_eq!(users[0]["_id"], ada.id.to_string());
}

// =============================================================================
// Store failure cleanup
// =============================================================================

struct BrokenStore;

#[async_trait]
impl SubmissionStore for BrokenStore {
    async fn create(&self, _: NewSubmission) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::DataCorruption("disk on fire".to_string()))
    }
    async fn list_approved(&self) -> Result<Vec<Submission>, RepositoryError> {
        Ok(vec![])
    }
    async fn list_pending(&self) -> Result<Vec<Submission>, RepositoryError> {
        Ok(vec![])
    }
    async fn get(&self, _: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Ok(None)
    }
    async fn approve(&self, _: SubmissionId) -> Result<(), RepositoryError> {
        Ok(())
    }
    async fn delete(&self, _: SubmissionId) -> Result<bool, RepositoryError> {
        Ok(false)
    }
    async fn ping(&self) -> Result<(), RepositoryError> {
        Err(RepositoryError::DataCorruption("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_removes_uploaded_image() {
    let images = Arc::new(MemoryImageHost::new());
    let state = AppState::new(config(), Arc::new(BrokenStore), images.clone());
    let app = super::app(state).unwrap();

    let response = send(&app, connect_request(Some("Ada"), png())).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["message"], "Internal server error");
    assert!(images.is_empty().await);
}

#[tokio::test]
async fn test_readiness_reflects_store() {
    let h = harness();
    let ready = send(&h.app, Request::get("/health/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(ready.status(), StatusCode::OK);

    let state = AppState::new(config(), Arc::new(BrokenStore), Arc::new(MemoryImageHost::new()));
    let app = super::app(state).unwrap();
    let ready = send(&app, Request::get("/health/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);

    let live = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(live.status(), StatusCode::OK);
}

// =============================================================================
// Login and verify
// =============================================================================

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::post("/api/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_login_sets_cookies_and_returns_token() {
    let h = harness();

    let response = send(&h.app, login_request("root", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("admin_token=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("is_admin=true")));

    let body = json_body(response).await;
    assert_eq!(body["message"], "Access Granted");
    assert_eq!(body["success"], true);
    assert!(h.state.gateway().verify(body["token"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_login_failures_look_identical() {
    let h = harness();

    let mut bodies = Vec::new();
    for (user, pass) in [("root", "nope"), ("admin", PASSWORD), ("admin", "nope")] {
        let response = send(&h.app, login_request(user, pass)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        bodies.push(json_body(response).await);
    }

    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
}

#[tokio::test]
async fn test_login_with_missing_fields_is_unauthorized() {
    let h = harness();
    let request = Request::post("/api/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    assert_eq!(send(&h.app, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_without_json_body_is_unauthorized() {
    let h = harness();
    let expected = json_body(send(&h.app, login_request("root", "nope")).await).await;

    let form = Request::post("/api/admin/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=root&password=x"))
        .unwrap();
    let untyped = Request::post("/api/admin/login")
        .body(Body::from("username=root&password=x"))
        .unwrap();
    let mistyped = Request::post("/api/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":5}"#))
        .unwrap();

    for request in [form, untyped, mistyped] {
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(response).await, expected);
    }
}

#[tokio::test]
async fn test_verify_reads_cookie_only() {
    let h = harness();
    let token = token(&h.state);

    let with_cookie = Request::get("/api/admin/verify")
        .header(header::COOKIE, format!("admin_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&h.app, with_cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["authenticated"], true);

    let with_bearer = admin_request(Method::GET, "/api/admin/verify", &token);
    let response = send(&h.app, with_bearer).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["authenticated"], false);

    let garbage = Request::get("/api/admin/verify")
        .header(header::COOKIE, "admin_token=not.a.jwt")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, garbage).await.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Moderation
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_token() {
    let h = harness();
    let ada = seed(&h.store, &h.images, "Ada").await;

    let requests = [
        (Method::GET, "/api/admin/pending".to_string()),
        (Method::PATCH, format!("/api/admin/approve/{}", ada.id)),
        (Method::DELETE, format!("/api/admin/reject/{}", ada.id)),
        (Method::DELETE, format!("/api/admin/user/{}", ada.id)),
    ];

    for (method, uri) in requests {
        let response = send(
            &h.app,
            Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["message"],
            "Authentication required. Access denied."
        );
    }

    // Nothing changed.
    assert_eq!(h.store.list_pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let h = harness();
    let expired = h
        .state
        .gateway()
        .signer()
        .issue_at(chrono::Utc::now() - chrono::Duration::hours(25))
        .unwrap()
        .token;

    let response = send(&h.app, admin_request(Method::GET, "/api/admin/pending", &expired)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["message"],
        "Session expired. Please log in again."
    );
}

#[tokio::test]
async fn test_cookie_token_authorizes_moderation() {
    let h = harness();
    let token = token(&h.state);

    let request = Request::get("/api/admin/pending")
        .header(header::COOKIE, format!("is_admin=true; admin_token={token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pending_newest_first_then_approve() {
    let h = harness();
    let token = token(&h.state);
    let first = seed(&h.store, &h.images, "first").await;
    let second = seed(&h.store, &h.images, "second").await;

    let pending = admin_request(Method::GET, "/api/admin/pending", &token);
    let body = json_body(send(&h.app, pending).await).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.id.to_string(), first.id.to_string()]);

    let uri = format!("/api/admin/approve/{}", first.id);
    for _ in 0..2 {
        let response = send(&h.app, admin_request(Method::PATCH, &uri, &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Node activated");
    }

    let approved = h.store.list_approved().await.unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, first.id);
}

#[tokio::test]
async fn test_approve_unknown_or_malformed_id_is_ok() {
    let h = harness();
    let token = token(&h.state);

    for uri in [
        format!("/api/admin/approve/{}", SubmissionId::generate()),
        "/api/admin/approve/not-an-id".to_string(),
    ] {
        let response = send(&h.app, admin_request(Method::PATCH, &uri, &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_reject_deletes_record_and_image() {
    let h = harness();
    let token = token(&h.state);
    let ada = seed(&h.store, &h.images, "Ada").await;

    let uri = format!("/api/admin/reject/{}", ada.id);
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Node purged");

    assert!(h.store.get(ada.id).await.unwrap().is_none());
    assert!(h.images.is_empty().await);

    // Rejecting again is still fine.
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reject_survives_image_host_failure() {
    let h = harness();
    let token = token(&h.state);
    let ada = seed(&h.store, &h.images, "Ada").await;
    h.images.fail_destroys(true);

    let uri = format!("/api/admin/reject/{}", ada.id);
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(h.store.get(ada.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_user_removes_record_and_image() {
    let h = harness();
    let token = token(&h.state);
    let ada = seed(&h.store, &h.images, "Ada").await;

    let uri = format!("/api/admin/user/{}", ada.id);
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "User and their image have been deleted."
    );
    assert!(h.store.is_empty().await);
    assert!(h.images.is_empty().await);
}

#[tokio::test]
async fn test_delete_user_unknown_id_is_not_found() {
    let h = harness();
    let token = token(&h.state);

    for uri in [
        format!("/api/admin/user/{}", SubmissionId::generate()),
        "/api/admin/user/42".to_string(),
    ] {
        let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "User does not exist." })
        );
    }
}

#[tokio::test]
async fn test_delete_user_with_missing_image_still_deletes() {
    let h = harness();
    let token = token(&h.state);
    let ada = seed(&h.store, &h.images, "Ada").await;

    // Image vanished on the host side.
    crate::services::images::ImageHost::destroy(h.images.as_ref(), &ada.image_url)
        .await
        .unwrap();

    let uri = format!("/api/admin/user/{}", ada.id);
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_delete_user_keeps_record_when_image_host_fails() {
    let h = harness();
    let token = token(&h.state);
    let ada = seed(&h.store, &h.images, "Ada").await;
    h.images.fail_destroys(true);

    let uri = format!("/api/admin/user/{}", ada.id);
    let response = send(&h.app, admin_request(Method::DELETE, &uri, &token)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.store.get(ada.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_cors_allows_frontend_with_credentials() {
    let h = harness();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/users")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = send(&h.app, request).await;
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}
