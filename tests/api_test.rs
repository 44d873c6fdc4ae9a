//! Router-level tests that are answered before any database access
//!
//! These run without a database: authentication, validation, rate limiting
//! and the shared middleware stack.

mod helpers;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use helpers::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tower::ServiceExt;

use CommunityHub::services::Claims;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.request(Method::GET, "/api/users", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("unauthorized"));
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.get("/api/events", "not-a-jwt").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("unauthorized"));
}

#[tokio::test]
async fn test_expired_token_is_reported() {
    let ctx = TestContext::offline();
    let issued = Utc::now() - Duration::hours(3);
    let claims = Claims {
        sub: "1".to_string(),
        role: "member".to_string(),
        permissions: 1,
        exp: (issued + Duration::hours(1)).timestamp() as usize,
        iat: issued.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = ctx.get("/api/auth/me", &token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("token_expired"));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let ctx = TestContext::offline();
    let now = Utc::now();
    let claims = Claims {
        sub: "1".to_string(),
        role: "super_admin".to_string(),
        permissions: 2047,
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-that-is-long-enough"),
    )
    .unwrap();

    let (status, _) = ctx.get("/api/admin/stats", &token).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validates_email_before_storage() {
    let ctx = TestContext::offline();
    let mut body = register_body();
    body["email"] = json!("not-an-email");

    let (status, body) = ctx
        .request(Method::POST, "/api/auth/register", None, Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_input"));
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let ctx = TestContext::offline();
    let mut body = register_body();
    body["password"] = json!("short");

    let (status, body) = ctx
        .request(Method::POST, "/api/auth/register", None, Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_input"));
}

#[tokio::test]
async fn test_register_disabled() {
    let mut settings = test_settings("postgresql://127.0.0.1:1/unreachable");
    settings.features.self_registration = false;
    let ctx = TestContext::offline_with(settings);

    let (status, body) = ctx
        .request(Method::POST, "/api/auth/register", None, Some(register_body()))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("forbidden"));
}

#[tokio::test]
async fn test_login_with_unusable_identifier() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identifier": "nobody", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("invalid_credentials"));
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut settings = test_settings("postgresql://127.0.0.1:1/unreachable");
    settings.rate_limit.max_requests = 2;
    settings.rate_limit.burst_allowance = 0;
    let ctx = TestContext::offline_with(settings);

    let login = json!({ "identifier": "nobody", "password": TEST_PASSWORD });
    for _ in 0..2 {
        let (status, _) = ctx
            .request(Method::POST, "/api/auth/login", None, Some(login.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = ctx
        .request(Method::POST, "/api/auth/login", None, Some(login))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], json!("rate_limited"));
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_the_limit() {
    let mut settings = test_settings("postgresql://127.0.0.1:1/unreachable");
    settings.rate_limit.max_requests = 2;
    settings.rate_limit.burst_allowance = 0;
    let ctx = TestContext::offline_with(settings);

    let login = json!({ "identifier": "nobody", "password": TEST_PASSWORD });
    let mut statuses = Vec::new();
    for hop in 1..=3 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", format!("198.51.100.{}", hop))
            .body(Body::from(login.to_string()))
            .unwrap();
        let (status, _) = ctx.send(request).await;
        statuses.push(status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn test_forwarded_for_is_honoured_behind_trusted_proxy() {
    let mut settings = test_settings("postgresql://127.0.0.1:1/unreachable");
    settings.rate_limit.max_requests = 1;
    settings.rate_limit.burst_allowance = 0;
    settings.rate_limit.trust_forwarded_for = true;
    let ctx = TestContext::offline_with(settings);

    let login = json!({ "identifier": "nobody", "password": TEST_PASSWORD });
    for hop in 1..=3 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", format!("198.51.100.{}", hop))
            .body(Body::from(login.to_string()))
            .unwrap();
        let (status, _) = ctx.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_malformed_json_is_a_client_error() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("invalid_input"));
}

#[tokio::test]
async fn test_missing_fields_are_invalid_input() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identifier": "someone@example.org" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("invalid_input"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.request(Method::GET, "/api/nothing-here", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .uri("/api/users")
        .body(Body::empty())
        .unwrap();
    let response = ctx.router.clone().oneshot(request).await.unwrap();

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(!request_id.is_empty());
}

#[tokio::test]
async fn test_incoming_request_id_is_preserved() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .uri("/api/users")
        .header("x-request-id", "trace-me-123")
        .body(Body::empty())
        .unwrap();
    let response = ctx.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("trace-me-123")
    );
}
