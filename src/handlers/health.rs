//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::database::health_check as database_health;
use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = match database_health(state.database.pool()).await {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "Database health check failed");
            false
        }
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database_ok { "ok" } else { "degraded" },
            "service": crate::NAME,
            "version": crate::VERSION,
            "database": if database_ok { "up" } else { "down" },
        })),
    )
}
