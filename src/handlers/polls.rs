//! Polls and voting

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::pagination::{Page, PageRequest};
use crate::models::poll::{CreatePollRequest, Poll, PollDetail, PollFilter, UpdatePollRequest, VoteRequest};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(page): AppQuery<PageRequest>,
    AppQuery(filter): AppQuery<PollFilter>,
) -> Result<Json<Page<Poll>>> {
    let params = state.page(&page);
    Ok(Json(state.services.poll_service.list(filter, params).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollDetail>)> {
    let poll = state.services.poll_service.create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn get(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<PollDetail>> {
    Ok(Json(state.services.poll_service.get(&ctx, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdatePollRequest>,
) -> Result<Json<Poll>> {
    Ok(Json(state.services.poll_service.update(&ctx, id, request).await?))
}

pub async fn close(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<Poll>> {
    Ok(Json(state.services.poll_service.close(&ctx, id).await?))
}

pub async fn delete(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.poll_service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<VoteRequest>,
) -> Result<Json<PollDetail>> {
    Ok(Json(state.services.poll_service.vote(&ctx, id, request.option_ids).await?))
}
