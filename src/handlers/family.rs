//! Family member records

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::approval::RejectRequest;
use crate::models::family::{CreateFamilyMemberRequest, FamilyMember, FamilyMemberFilter, UpdateFamilyMemberRequest};
use crate::models::pagination::{Page, PageRequest};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn list(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(page): AppQuery<PageRequest>,
    AppQuery(filter): AppQuery<FamilyMemberFilter>,
) -> Result<Json<Page<FamilyMember>>> {
    let params = state.page(&page);
    Ok(Json(state.services.family_service.list(&ctx, filter, params).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<CreateFamilyMemberRequest>,
) -> Result<(StatusCode, Json<FamilyMember>)> {
    let member = state.services.family_service.create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<FamilyMember>> {
    Ok(Json(state.services.family_service.get(&ctx, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateFamilyMemberRequest>,
) -> Result<Json<FamilyMember>> {
    Ok(Json(state.services.family_service.update(&ctx, id, request).await?))
}

pub async fn delete(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.family_service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
) -> Result<Json<FamilyMember>> {
    Ok(Json(state.services.family_service.approve(&ctx, id).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<RejectRequest>,
) -> Result<Json<FamilyMember>> {
    Ok(Json(state.services.family_service.reject(&ctx, id, &request.reason).await?))
}
