//! Logging middleware
//!
//! One structured line per request with method, path, status, latency and
//! the request id assigned by the request-id layer.

use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SLOW_REQUEST: Duration = Duration::from_secs(1);

fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let duration_ms = elapsed.as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), duration_ms, %request_id, "Request failed");
    } else if status.is_client_error() && status != StatusCode::NOT_FOUND {
        warn!(%method, %path, status = status.as_u16(), duration_ms, %request_id, "Request rejected");
    } else {
        info!(%method, %path, status = status.as_u16(), duration_ms, %request_id, "Request completed");
    }

    if elapsed > SLOW_REQUEST {
        warn!(%method, %path, duration_ms, %request_id, "Slow request detected");
    }

    response
}
