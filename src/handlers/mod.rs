//! HTTP handlers module
//!
//! One module per resource plus the router that wires them together:
//! - Public endpoints: health, registration and login (rate limited)
//! - Everything else under `/api` requires a bearer token

pub mod admin;
pub mod auth;
pub mod comments;
pub mod events;
pub mod extract;
pub mod family;
pub mod health;
pub mod polls;
pub mod users;

use std::time::Duration;

use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderName, HeaderValue, Method, Request, Uri};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn};

use crate::config::ServerConfig;
use crate::middleware::logging::{log_requests, REQUEST_ID_HEADER};
use crate::middleware::{rate_limit, require_auth};
use crate::state::AppState;
use crate::utils::errors::CommunityError;

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    // Unauthenticated and rate limited
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route_layer(from_fn_with_state(state.clone(), rate_limit));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", put(auth::change_password))
        .merge(user_routes())
        .merge(family_routes())
        .merge(event_routes())
        .merge(poll_routes())
        .merge(comment_routes())
        .merge(admin_routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let server = &state.settings.server;

    Router::new()
        .route("/health", get(health::health_check))
        .merge(public)
        .merge(protected)
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(from_fn(log_requests))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors_layer(server))
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_seconds))),
        )
        .with_state(state)
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/stats", get(users::stats))
        .route(
            "/api/users/{id}",
            get(users::get).put(users::update).delete(users::deactivate),
        )
        .route("/api/users/{id}/family", get(users::family))
        .route("/api/users/{id}/transfers", get(users::transfers))
        .route("/api/users/{id}/approve", post(users::approve))
        .route("/api/users/{id}/reject", post(users::reject))
        .route("/api/users/{id}/transfer-primary", post(users::transfer_primary))
        .route("/api/users/{id}/role", put(users::assign_role))
}

fn family_routes() -> Router<AppState> {
    Router::new()
        .route("/api/family-members", get(family::list).post(family::create))
        .route(
            "/api/family-members/{id}",
            get(family::get).put(family::update).delete(family::delete),
        )
        .route("/api/family-members/{id}/approve", post(family::approve))
        .route("/api/family-members/{id}/reject", post(family::reject))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(events::list).post(events::create))
        .route(
            "/api/events/{id}",
            get(events::get).put(events::update).delete(events::delete),
        )
        .route("/api/events/{id}/cancel", post(events::cancel))
        .route(
            "/api/events/{id}/rsvp",
            get(events::list_rsvps).post(events::rsvp).delete(events::remove_rsvp),
        )
}

fn poll_routes() -> Router<AppState> {
    Router::new()
        .route("/api/polls", get(polls::list).post(polls::create))
        .route(
            "/api/polls/{id}",
            get(polls::get).put(polls::update).delete(polls::delete),
        )
        .route("/api/polls/{id}/vote", post(polls::vote))
        .route("/api/polls/{id}/close", post(polls::close))
}

fn comment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/comments/events/{id}/comments",
            get(comments::list_for_event).post(comments::create),
        )
        .route("/api/comments/{id}", put(comments::update).delete(comments::delete))
        .route("/api/comments/{id}/like", post(comments::like))
        .route("/api/comments/{id}/flag", post(comments::flag))
        .route("/api/comments/{id}/moderate", post(comments::moderate))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/activity-logs", get(admin::activity_logs))
        .route("/api/admin/permissions", get(admin::permissions))
        .route("/api/admin/comments/flagged", get(admin::flagged_comments))
        .route("/api/admin/roles", get(admin::list_roles).post(admin::create_role))
        .route("/api/admin/roles/{id}", put(admin::update_role).delete(admin::delete_role))
        .route("/api/admin/enums", get(admin::list_enums).post(admin::create_enum))
        .route("/api/admin/enums/{id}", put(admin::update_enum).delete(admin::delete_enum))
}

async fn route_not_found(uri: Uri) -> CommunityError {
    CommunityError::RouteNotFound(uri.path().to_string())
}

/// Errors raised by tower layers rather than handlers
async fn handle_layer_error(err: BoxError) -> CommunityError {
    if err.is::<Elapsed>() {
        warn!("Request timed out");
        CommunityError::Timeout
    } else {
        CommunityError::Internal(err.to_string())
    }
}

/// `*` or an empty list allows any origin
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_config(origins: &[&str]) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: origins.iter().map(|o| o.to_string()).collect(),
            request_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_lists() {
        // Construction must not panic for either shape
        let _ = cors_layer(&server_config(&["*"]));
        let _ = cors_layer(&server_config(&[]));
        let _ = cors_layer(&server_config(&["https://community.example.org", "bad\norigin"]));
    }

    #[tokio::test]
    async fn test_elapsed_timeout_becomes_request_timeout() {
        let err = handle_layer_error(Box::new(Elapsed::new())).await;
        assert!(matches!(err, CommunityError::Timeout));

        let err = handle_layer_error("layer failed".into()).await;
        assert!(matches!(err, CommunityError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unmatched_route_names_the_path() {
        let err = route_not_found(Uri::from_static("/api/nothing-here?x=1")).await;
        assert!(matches!(err, CommunityError::RouteNotFound(ref path) if path == "/api/nothing-here"));
    }
}
