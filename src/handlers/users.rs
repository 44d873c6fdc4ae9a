//! Member directory, approvals, roles and primary account transfers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::approval::{ApprovalStats, RejectRequest};
use crate::models::family::FamilyView;
use crate::models::pagination::{Page, PageRequest};
use crate::models::transfer::{PrimaryAccountTransfer, TransferRequest};
use crate::models::user::{AssignRoleRequest, UpdateUserRequest, User, UserFilter};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn list(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(page): AppQuery<PageRequest>,
    AppQuery(filter): AppQuery<UserFilter>,
) -> Result<Json<Page<User>>> {
    let params = state.page(&page);
    let users = state.services.user_service.list(&ctx, filter, params).await?;
    Ok(Json(users))
}

pub async fn stats(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<ApprovalStats>> {
    Ok(Json(state.services.user_service.approval_stats(&ctx).await?))
}

pub async fn get(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.get(&ctx, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.update_profile(&ctx, id, request).await?))
}

/// Soft delete
pub async fn deactivate(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.deactivate(&ctx, id).await?))
}

pub async fn approve(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.approve(&ctx, id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<RejectRequest>,
) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.reject(&ctx, id, &request.reason).await?))
}

pub async fn assign_role(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<AssignRoleRequest>,
) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.assign_role(&ctx, id, request.role_id).await?))
}

pub async fn family(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<FamilyView>> {
    Ok(Json(state.services.user_service.family(&ctx, id).await?))
}

pub async fn transfer_primary(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<TransferRequest>,
) -> Result<(StatusCode, Json<PrimaryAccountTransfer>)> {
    let transfer = state
        .services
        .transfer_service
        .transfer_primary(&ctx, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn transfers(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Vec<PrimaryAccountTransfer>>> {
    Ok(Json(state.services.transfer_service.history(&ctx, id).await?))
}
