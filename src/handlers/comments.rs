//! Event comment threads

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::comment::{
    Comment, CommentView, CreateCommentRequest, FlagCommentRequest, LikeState, ModerateCommentRequest,
    UpdateCommentRequest,
};
use crate::models::pagination::{Page, PageRequest};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn list_for_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(event_id): AppPath<i64>,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<Json<Page<CommentView>>> {
    let params = state.page(&page);
    Ok(Json(state.services.comment_service.list_for_event(&ctx, event_id, params).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(event_id): AppPath<i64>,
    AppJson(request): AppJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state.services.comment_service.create(&ctx, event_id, request).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateCommentRequest>,
) -> Result<Json<Comment>> {
    Ok(Json(state.services.comment_service.update(&ctx, id, &request.content).await?))
}

pub async fn delete(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.comment_service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<LikeState>> {
    Ok(Json(state.services.comment_service.toggle_like(&ctx, id).await?))
}

pub async fn flag(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<FlagCommentRequest>,
) -> Result<Json<Comment>> {
    Ok(Json(state.services.comment_service.flag(&ctx, id, request.reason).await?))
}

pub async fn moderate(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<ModerateCommentRequest>,
) -> Result<Json<Comment>> {
    Ok(Json(state.services.comment_service.moderate(&ctx, id, request).await?))
}
