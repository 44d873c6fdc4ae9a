//! Event repository implementation

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::event::{
    CreateEventRequest, Event, EventFilter, EventRsvp, RsvpRequest, RsvpTally, RsvpWithUser, UpdateEventRequest,
};
use crate::models::pagination::PageParams;
use crate::utils::errors::CommunityError;
use crate::utils::helpers::contains_pattern;

const EVENT_COLUMNS: &str = r#"
    id, title, description, category, location, starts_at, ends_at, rsvp_deadline,
    max_attendees, is_cancelled, created_by, created_at, updated_at
"#;

const RSVP_COLUMNS: &str = "id, event_id, user_id, response, guests, note, created_at, updated_at";

const TALLY_QUERY: &str = r#"
    SELECT COUNT(*) FILTER (WHERE response = 'going') AS going,
           COUNT(*) FILTER (WHERE response = 'maybe') AS maybe,
           COUNT(*) FILTER (WHERE response = 'not_going') AS not_going,
           COALESCE(SUM(guests) FILTER (WHERE response = 'going'), 0)::BIGINT AS guests
    FROM event_rsvps
    WHERE event_id = $1
"#;

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest, created_by: i64) -> Result<Event, CommunityError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, description, category, location, starts_at, ends_at,
                                rsvp_deadline, max_attendees, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.title)
        .bind(request.description)
        .bind(request.category)
        .bind(request.location)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.rsvp_deadline)
        .bind(request.max_attendees)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, CommunityError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    pub async fn get(&self, id: i64) -> Result<Event, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::EventNotFound { event_id: id })
    }

    /// Update event
    pub async fn update(&self, id: i64, request: UpdateEventRequest) -> Result<Event, CommunityError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                starts_at = COALESCE($6, starts_at),
                ends_at = COALESCE($7, ends_at),
                rsvp_deadline = COALESCE($8, rsvp_deadline),
                max_attendees = COALESCE($9, max_attendees),
                updated_at = $10
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.category)
        .bind(request.location)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.rsvp_deadline)
        .bind(request.max_attendees)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or(CommunityError::EventNotFound { event_id: id })
    }

    pub async fn cancel(&self, id: i64) -> Result<Event, CommunityError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET is_cancelled = TRUE, updated_at = $2 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or(CommunityError::EventNotFound { event_id: id })
    }

    /// Delete event
    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Upcoming events soonest first; otherwise newest first
    pub async fn list(
        &self,
        filter: &EventFilter,
        now: DateTime<Utc>,
        params: PageParams,
    ) -> Result<(Vec<Event>, i64), CommunityError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE 1=1");
        push_event_filters(&mut count_query, filter, now);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1=1"));
        push_event_filters(&mut query, filter, now);
        if filter.upcoming_only.unwrap_or(false) {
            query.push(" ORDER BY starts_at ASC, id ASC");
        } else {
            query.push(" ORDER BY starts_at DESC, id DESC");
        }
        query
            .push(" LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let events = query.build_query_as::<Event>().fetch_all(&self.pool).await?;

        Ok((events, total))
    }

    pub async fn count_upcoming(&self, now: DateTime<Utc>) -> Result<i64, CommunityError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE starts_at > $1 AND NOT is_cancelled")
                .bind(now)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// RSVP counts for one event
    pub async fn tally(&self, event_id: i64) -> Result<RsvpTally, CommunityError> {
        let tally = sqlx::query_as::<_, RsvpTally>(TALLY_QUERY)
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(tally)
    }

    pub async fn find_rsvp(&self, event_id: i64, user_id: i64) -> Result<Option<EventRsvp>, CommunityError> {
        let mut conn = self.pool.acquire().await?;
        find_rsvp_in(&mut conn, event_id, user_id).await
    }

    /// Create or replace a member's RSVP. The event row is locked so that
    /// concurrent RSVPs cannot overbook it.
    pub async fn upsert_rsvp(
        &self,
        event_id: i64,
        user_id: i64,
        request: &RsvpRequest,
        now: DateTime<Utc>,
    ) -> Result<EventRsvp, CommunityError> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommunityError::EventNotFound { event_id })?;

        event.ensure_rsvp_open(now)?;

        let tally = sqlx::query_as::<_, RsvpTally>(TALLY_QUERY)
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
        let previous = find_rsvp_in(&mut tx, event_id, user_id).await?;
        tally.ensure_capacity(event.max_attendees, previous.as_ref(), request.response, request.guests)?;

        let rsvp = sqlx::query_as::<_, EventRsvp>(&format!(
            r#"
            INSERT INTO event_rsvps (event_id, user_id, response, guests, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (event_id, user_id)
            DO UPDATE SET response = EXCLUDED.response,
                          guests = EXCLUDED.guests,
                          note = EXCLUDED.note,
                          updated_at = EXCLUDED.updated_at
            RETURNING {RSVP_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(request.response)
        .bind(request.guests)
        .bind(&request.note)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(rsvp)
    }

    pub async fn remove_rsvp(&self, event_id: i64, user_id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM event_rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// RSVPs with responder names, going first
    pub async fn list_rsvps(&self, event_id: i64) -> Result<Vec<RsvpWithUser>, CommunityError> {
        let rsvps = sqlx::query_as::<_, RsvpWithUser>(
            r#"
            SELECT r.user_id, u.first_name, u.last_name, r.response, r.guests, r.note, r.updated_at
            FROM event_rsvps r
            JOIN users u ON u.id = r.user_id
            WHERE r.event_id = $1
            ORDER BY r.response, u.last_name, u.first_name
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rsvps)
    }
}

async fn find_rsvp_in(
    conn: &mut PgConnection,
    event_id: i64,
    user_id: i64,
) -> Result<Option<EventRsvp>, CommunityError> {
    let rsvp = sqlx::query_as::<_, EventRsvp>(&format!(
        "SELECT {RSVP_COLUMNS} FROM event_rsvps WHERE event_id = $1 AND user_id = $2"
    ))
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(rsvp)
}

fn push_event_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter, now: DateTime<Utc>) {
    if let Some(category) = filter.category {
        query.push(" AND category = ").push_bind(category);
    }
    if filter.upcoming_only.unwrap_or(false) {
        query.push(" AND starts_at > ").push_bind(now);
    }
    if !filter.include_cancelled.unwrap_or(false) {
        query.push(" AND NOT is_cancelled");
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
