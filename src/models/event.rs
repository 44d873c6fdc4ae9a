//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{CommunityError, Result};

/// Largest number of guests one RSVP may bring
pub const MAX_GUESTS_PER_RSVP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Funeral,
    Marriage,
    Festival,
    Meeting,
    Birthday,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rsvp_response", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RsvpResponse {
    Going,
    Maybe,
    NotGoing,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub rsvp_deadline: Option<DateTime<Utc>>,
    pub max_attendees: Option<i32>,
    pub is_cancelled: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Check that RSVPs are still accepted at `now`
    pub fn ensure_rsvp_open(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_cancelled {
            return Err(CommunityError::InvalidStateTransition {
                from: "cancelled".to_string(),
                to: "rsvp".to_string(),
            });
        }
        if now >= self.starts_at {
            return Err(CommunityError::InvalidInput(
                "Event has already started".to_string(),
            ));
        }
        if let Some(deadline) = self.rsvp_deadline {
            if now > deadline {
                return Err(CommunityError::InvalidInput(
                    "RSVP deadline has passed".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Validate the relationship between start, end and RSVP deadline
pub fn validate_schedule(
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    rsvp_deadline: Option<DateTime<Utc>>,
) -> Result<()> {
    if let Some(ends_at) = ends_at {
        if ends_at < starts_at {
            return Err(CommunityError::InvalidInput(
                "Event cannot end before it starts".to_string(),
            ));
        }
    }
    if let Some(deadline) = rsvp_deadline {
        if deadline > starts_at {
            return Err(CommunityError::InvalidInput(
                "RSVP deadline must not be after the event starts".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRsvp {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub response: RsvpResponse,
    pub guests: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRsvp {
    /// Seats this RSVP occupies (the member plus guests when going)
    pub fn seats(&self) -> i64 {
        seats_for(self.response, self.guests)
    }
}

pub fn seats_for(response: RsvpResponse, guests: i32) -> i64 {
    match response {
        RsvpResponse::Going => 1 + i64::from(guests.max(0)),
        RsvpResponse::Maybe | RsvpResponse::NotGoing => 0,
    }
}

/// RSVP with the responder's name for attendee lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RsvpWithUser {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub response: RsvpResponse,
    pub guests: i32,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated RSVP counts for one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RsvpTally {
    pub going: i64,
    pub maybe: i64,
    pub not_going: i64,
    /// Guests brought by members who are going
    pub guests: i64,
}

impl RsvpTally {
    /// Members going plus their guests
    pub fn attending(&self) -> i64 {
        self.going + self.guests
    }

    /// Check that replacing `previous` with a new response fits `max_attendees`
    pub fn ensure_capacity(
        &self,
        max_attendees: Option<i32>,
        previous: Option<&EventRsvp>,
        response: RsvpResponse,
        guests: i32,
    ) -> Result<()> {
        let Some(max) = max_attendees else {
            return Ok(());
        };
        let requested = seats_for(response, guests);
        if requested == 0 {
            return Ok(());
        }
        let released = previous.map(EventRsvp::seats).unwrap_or(0);
        let projected = self.attending() - released + requested;
        if projected > i64::from(max) {
            return Err(CommunityError::Conflict(format!(
                "Event is full ({} of {} seats taken)",
                self.attending(),
                max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub rsvp_tally: RsvpTally,
    pub attending: i64,
    pub my_rsvp: Option<EventRsvp>,
}

impl EventDetail {
    pub fn new(event: Event, rsvp_tally: RsvpTally, my_rsvp: Option<EventRsvp>) -> Self {
        Self {
            attending: rsvp_tally.attending(),
            event,
            rsvp_tally,
            my_rsvp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub rsvp_deadline: Option<DateTime<Utc>>,
    pub max_attendees: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub rsvp_deadline: Option<DateTime<Utc>>,
    pub max_attendees: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsvpRequest {
    pub response: RsvpResponse,
    #[serde(default)]
    pub guests: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub upcoming_only: Option<bool>,
    pub include_cancelled: Option<bool>,
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn event(starts_in_hours: i64) -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            title: "Diwali Milan".to_string(),
            description: None,
            category: EventCategory::Festival,
            location: Some("Community Hall".to_string()),
            starts_at: now + Duration::hours(starts_in_hours),
            ends_at: None,
            rsvp_deadline: None,
            max_attendees: Some(5),
            is_cancelled: false,
            created_by: Some(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn rsvp(response: RsvpResponse, guests: i32) -> EventRsvp {
        EventRsvp {
            id: 1,
            event_id: 1,
            user_id: 7,
            response,
            guests,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_schedule_validation() {
        let start = Utc::now();
        assert!(validate_schedule(start, Some(start + Duration::hours(2)), None).is_ok());
        assert!(validate_schedule(start, Some(start - Duration::hours(1)), None).is_err());
        assert!(validate_schedule(start, None, Some(start + Duration::minutes(1))).is_err());
        assert!(validate_schedule(start, None, Some(start)).is_ok());
    }

    #[test]
    fn test_rsvp_window() {
        let now = Utc::now();
        assert!(event(24).ensure_rsvp_open(now).is_ok());
        assert_matches!(event(-1).ensure_rsvp_open(now), Err(CommunityError::InvalidInput(_)));

        let mut cancelled = event(24);
        cancelled.is_cancelled = true;
        assert_matches!(
            cancelled.ensure_rsvp_open(now),
            Err(CommunityError::InvalidStateTransition { .. })
        );

        let mut closed = event(24);
        closed.rsvp_deadline = Some(now - Duration::hours(1));
        assert_matches!(closed.ensure_rsvp_open(now), Err(CommunityError::InvalidInput(_)));
    }

    #[test]
    fn test_capacity_counts_guests() {
        let tally = RsvpTally {
            going: 2,
            maybe: 1,
            not_going: 0,
            guests: 1,
        };
        assert_eq!(tally.attending(), 3);
        assert!(tally.ensure_capacity(Some(5), None, RsvpResponse::Going, 1).is_ok());
        assert_matches!(
            tally.ensure_capacity(Some(5), None, RsvpResponse::Going, 2),
            Err(CommunityError::Conflict(_))
        );
        assert!(tally.ensure_capacity(Some(3), None, RsvpResponse::Maybe, 0).is_ok());
        assert!(tally.ensure_capacity(None, None, RsvpResponse::Going, 10).is_ok());
    }

    #[test]
    fn test_capacity_releases_previous_seats() {
        let tally = RsvpTally {
            going: 3,
            maybe: 0,
            not_going: 0,
            guests: 2,
        };
        let previous = rsvp(RsvpResponse::Going, 2);
        // 5 seats taken, 3 of them by this member; re-RSVP with 1 guest needs 2
        assert!(tally
            .ensure_capacity(Some(5), Some(&previous), RsvpResponse::Going, 1)
            .is_ok());
        assert!(tally
            .ensure_capacity(Some(4), Some(&previous), RsvpResponse::Going, 2)
            .is_err());
    }

    #[test]
    fn test_detail_attending() {
        let tally = RsvpTally {
            going: 4,
            maybe: 2,
            not_going: 1,
            guests: 3,
        };
        let detail = EventDetail::new(event(5), tally, None);
        assert_eq!(detail.attending, 7);
    }
}
