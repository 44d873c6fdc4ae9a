//! Events and RSVPs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{AppJson, AppPath, AppQuery};
use crate::models::event::{
    CreateEventRequest, Event, EventDetail, EventFilter, EventRsvp, RsvpRequest, RsvpWithUser, UpdateEventRequest,
};
use crate::models::pagination::{Page, PageRequest};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(page): AppQuery<PageRequest>,
    AppQuery(filter): AppQuery<EventFilter>,
) -> Result<Json<Page<Event>>> {
    let params = state.page(&page);
    Ok(Json(state.services.event_service.list(filter, params).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppJson(request): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.services.event_service.create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<EventDetail>> {
    Ok(Json(state.services.event_service.get(&ctx, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateEventRequest>,
) -> Result<Json<Event>> {
    Ok(Json(state.services.event_service.update(&ctx, id, request).await?))
}

pub async fn cancel(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<Json<Event>> {
    Ok(Json(state.services.event_service.cancel(&ctx, id).await?))
}

pub async fn delete(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.event_service.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_rsvps(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> Result<Json<Vec<RsvpWithUser>>> {
    Ok(Json(state.services.event_service.list_rsvps(id).await?))
}

pub async fn rsvp(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<RsvpRequest>,
) -> Result<Json<EventRsvp>> {
    Ok(Json(state.services.event_service.rsvp(&ctx, id, request).await?))
}

pub async fn remove_rsvp(State(state): State<AppState>, ctx: AuthContext, AppPath(id): AppPath<i64>) -> Result<StatusCode> {
    state.services.event_service.remove_rsvp(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
