//! Event service implementation
//!
//! Event management and RSVPs.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::config::settings::FeaturesConfig;
use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::event::{
    validate_schedule, CreateEventRequest, Event, EventDetail, EventFilter, EventRsvp, RsvpRequest, RsvpWithUser,
    UpdateEventRequest, MAX_GUESTS_PER_RSVP,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::Permissions;
use crate::services::auth::AuthContext;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{clean_optional, normalize_whitespace};
use crate::utils::logging::log_event_action;

const MAX_TITLE_LEN: usize = 200;

#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    features: FeaturesConfig,
}

impl EventService {
    pub fn new(db: DatabaseService, features: FeaturesConfig) -> Self {
        Self { db, features }
    }

    pub async fn list(&self, filter: EventFilter, params: PageParams) -> Result<Page<Event>> {
        let (events, total) = self.db.events.list(&filter, Utc::now(), params).await?;
        Ok(Page::new(events, total, params))
    }

    /// Event with RSVP tallies and the caller's own RSVP
    pub async fn get(&self, ctx: &AuthContext, event_id: i64) -> Result<EventDetail> {
        let event = self.db.events.get(event_id).await?;
        let tally = self.db.events.tally(event_id).await?;
        let my_rsvp = self.db.events.find_rsvp(event_id, ctx.user_id()).await?;
        Ok(EventDetail::new(event, tally, my_rsvp))
    }

    pub async fn create(&self, ctx: &AuthContext, mut request: CreateEventRequest) -> Result<Event> {
        if !self.features.member_event_creation {
            ctx.require(Permissions::MANAGE_EVENTS)?;
        }

        request.title = validate_title(&request.title)?;
        request.description = clean_optional(request.description);
        request.location = clean_optional(request.location);
        validate_schedule(request.starts_at, request.ends_at, request.rsvp_deadline)?;
        validate_capacity(request.max_attendees)?;

        let event = self.db.events.create(request, ctx.user_id()).await?;
        info!(event_id = event.id, actor_id = ctx.user_id(), "Event created");
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::EVENT_CREATED, "event", Some(event.id))
                    .with_details(json!({ "title": event.title, "category": event.category })),
            )
            .await;
        Ok(event)
    }

    pub async fn update(&self, ctx: &AuthContext, event_id: i64, mut request: UpdateEventRequest) -> Result<Event> {
        let event = self.db.events.get(event_id).await?;
        self.require_manage(ctx, &event)?;
        if event.is_cancelled {
            return Err(CommunityError::InvalidStateTransition {
                from: "cancelled".to_string(),
                to: "updated".to_string(),
            });
        }

        if let Some(title) = request.title.as_deref() {
            request.title = Some(validate_title(title)?);
        }
        validate_schedule(
            request.starts_at.unwrap_or(event.starts_at),
            request.ends_at.or(event.ends_at),
            request.rsvp_deadline.or(event.rsvp_deadline),
        )?;
        validate_capacity(request.max_attendees)?;

        let updated = self.db.events.update(event_id, request).await?;
        self.db
            .log_activity(NewActivityLog::new(
                Some(ctx.user_id()),
                actions::EVENT_UPDATED,
                "event",
                Some(event_id),
            ))
            .await;
        Ok(updated)
    }

    /// Cancel an event; cancelling twice is a no-op
    pub async fn cancel(&self, ctx: &AuthContext, event_id: i64) -> Result<Event> {
        let event = self.db.events.get(event_id).await?;
        self.require_manage(ctx, &event)?;
        if event.is_cancelled {
            return Ok(event);
        }

        let cancelled = self.db.events.cancel(event_id).await?;
        info!(event_id = event_id, actor_id = ctx.user_id(), "Event cancelled");
        self.db
            .log_activity(NewActivityLog::new(
                Some(ctx.user_id()),
                actions::EVENT_CANCELLED,
                "event",
                Some(event_id),
            ))
            .await;
        Ok(cancelled)
    }

    pub async fn delete(&self, ctx: &AuthContext, event_id: i64) -> Result<()> {
        let event = self.db.events.get(event_id).await?;
        self.require_manage(ctx, &event)?;

        self.db.events.delete(event_id).await?;
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::EVENT_DELETED, "event", Some(event_id))
                    .with_details(json!({ "title": event.title })),
            )
            .await;
        Ok(())
    }

    /// Create or replace the caller's RSVP
    pub async fn rsvp(&self, ctx: &AuthContext, event_id: i64, mut request: RsvpRequest) -> Result<EventRsvp> {
        if !(0..=MAX_GUESTS_PER_RSVP).contains(&request.guests) {
            return Err(CommunityError::InvalidInput(format!(
                "Guests must be between 0 and {}",
                MAX_GUESTS_PER_RSVP
            )));
        }
        request.note = clean_optional(request.note);

        let rsvp = self
            .db
            .events
            .upsert_rsvp(event_id, ctx.user_id(), &request, Utc::now())
            .await?;
        log_event_action(
            event_id,
            "rsvp",
            ctx.user_id(),
            Some(&format!("{:?} +{}", rsvp.response, rsvp.guests)),
        );
        Ok(rsvp)
    }

    pub async fn remove_rsvp(&self, ctx: &AuthContext, event_id: i64) -> Result<()> {
        self.db.events.get(event_id).await?;
        if !self.db.events.remove_rsvp(event_id, ctx.user_id()).await? {
            return Err(CommunityError::NotFound {
                entity: "RSVP",
                id: event_id,
            });
        }
        log_event_action(event_id, "rsvp_removed", ctx.user_id(), None);
        Ok(())
    }

    pub async fn list_rsvps(&self, event_id: i64) -> Result<Vec<RsvpWithUser>> {
        self.db.events.get(event_id).await?;
        self.db.events.list_rsvps(event_id).await
    }

    /// Event managers, or the creator when members may create events
    fn require_manage(&self, ctx: &AuthContext, event: &Event) -> Result<()> {
        if self.features.member_event_creation && event.created_by == Some(ctx.user_id()) {
            return Ok(());
        }
        ctx.require(Permissions::MANAGE_EVENTS)
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = normalize_whitespace(title);
    if title.is_empty() {
        return Err(CommunityError::InvalidInput("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CommunityError::InvalidInput(format!(
            "Title is limited to {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title)
}

fn validate_capacity(max_attendees: Option<i32>) -> Result<()> {
    match max_attendees {
        Some(max) if max < 1 => Err(CommunityError::InvalidInput(
            "max_attendees must be at least 1".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Annual   Meet ").ok(), Some("Annual Meet".to_string()));
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(None).is_ok());
        assert!(validate_capacity(Some(1)).is_ok());
        assert!(validate_capacity(Some(0)).is_err());
    }
}
