//! Test context for exercising the HTTP API in-process

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use CommunityHub::database::{create_lazy_pool, DatabaseService};
use CommunityHub::models::user::User;
use CommunityHub::{create_router, AppState, Settings};

use super::database_helper::{init_test_logging, test_settings, TestDatabase};

/// Router plus the state behind it
pub struct TestContext {
    pub state: AppState,
    pub router: Router,
    pub database: Option<TestDatabase>,
}

impl TestContext {
    /// Context whose pool never connects; only usable for requests that are
    /// answered before touching the database
    pub fn offline() -> Self {
        Self::offline_with(test_settings("postgresql://127.0.0.1:1/unreachable"))
    }

    pub fn offline_with(settings: Settings) -> Self {
        init_test_logging();
        let pool = create_lazy_pool(&settings.database).expect("Failed to create lazy pool");
        let state = AppState::new(settings, DatabaseService::new(pool));

        Self {
            router: create_router(state.clone()),
            state,
            database: None,
        }
    }

    /// Context backed by `TEST_DATABASE_URL`, or `None` when it is unset
    pub async fn with_database() -> Option<Self> {
        let database = TestDatabase::from_env().await?;
        let settings = test_settings(&database.database_url);
        let state = AppState::new(settings, DatabaseService::new(database.pool.clone()));

        Some(Self {
            router: create_router(state.clone()),
            state,
            database: Some(database),
        })
    }

    pub fn token_for(&self, user: &User) -> String {
        let (token, _) = self
            .state
            .services
            .auth_service
            .issue_token(user)
            .expect("Failed to issue token");
        token
    }

    /// Send a request through the router and decode the JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Send a prebuilt request and decode the JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}
