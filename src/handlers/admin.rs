//! Admin tools: dashboard, roles, activity logs, enums and moderation queue

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::admin::{
    ActivityLog, ActivityLogFilter, CreateEnumRequest, CreateRoleRequest, DashboardStats, EnumFilter, EnumValue, Role,
    RoleView, UpdateEnumRequest, UpdateRoleRequest,
};
use crate::models::comment::Comment;
use crate::models::pagination::{Page, PageRequest};
use crate::models::permission::PermissionInfo;
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn stats(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<DashboardStats>> {
    Ok(Json(state.services.admin_service.dashboard_stats(&ctx).await?))
}

pub async fn activity_logs(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(page): AppQuery<PageRequest>,
    AppQuery(filter): AppQuery<ActivityLogFilter>,
) -> Result<Json<Page<ActivityLog>>> {
    let params = state.page(&page);
    Ok(Json(state.services.admin_service.activity_logs(&ctx, filter, params).await?))
}

pub async fn permissions(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<Vec<PermissionInfo>>> {
    Ok(Json(state.services.admin_service.permission_catalogue(&ctx)?))
}

pub async fn flagged_comments(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<Json<Page<Comment>>> {
    let params = state.page(&page);
    Ok(Json(state.services.comment_service.flagged(&ctx, params).await?))
}

pub async fn list_roles(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<Vec<RoleView>>> {
    Ok(Json(state.services.admin_service.list_roles(&ctx).await?))
}

pub async fn create_role(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>)> {
    let role = state.services.admin_service.create_role(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_role(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateRoleRequest>,
) -> Result<Json<Role>> {
    Ok(Json(state.services.admin_service.update_role(&ctx, id, request).await?))
}

pub async fn delete_role(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.admin_service.delete_role(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_enums(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(filter): AppQuery<EnumFilter>,
) -> Result<Json<Vec<EnumValue>>> {
    Ok(Json(state.services.admin_service.list_enums(&ctx, filter).await?))
}

pub async fn create_enum(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<CreateEnumRequest>,
) -> Result<(StatusCode, Json<EnumValue>)> {
    let value = state.services.admin_service.create_enum(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(value)))
}

pub async fn update_enum(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateEnumRequest>,
) -> Result<Json<EnumValue>> {
    Ok(Json(state.services.admin_service.update_enum(&ctx, id, request).await?))
}

pub async fn delete_enum(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.admin_service.delete_enum(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
