//! Registration, login and the caller's own account

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::extract::AppJson;
use crate::models::user::{ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, User};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub permissions: Vec<&'static str>,
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.services.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(State(state): State<AppState>, AppJson(request): AppJson<LoginRequest>) -> Result<Json<LoginResponse>> {
    let response = state.services.auth_service.login(request).await?;
    Ok(Json(response))
}

pub async fn me(ctx: AuthContext) -> Json<MeResponse> {
    let permissions = ctx.permissions.names();
    Json(MeResponse {
        user: ctx.user,
        permissions,
    })
}

pub async fn change_password(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state.services.auth_service.change_password(&ctx, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
