//! Poll repository implementation

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::pagination::PageParams;
use crate::models::poll::{Poll, PollFilter, PollOption, UpdatePollRequest};
use crate::utils::errors::CommunityError;
use crate::utils::helpers::contains_pattern;

const POLL_COLUMNS: &str =
    "id, title, description, allow_multiple, ends_at, is_closed, created_by, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PollRepository {
    pool: PgPool,
}

impl PollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a poll and its options together
    pub async fn create(
        &self,
        title: &str,
        description: Option<&str>,
        allow_multiple: bool,
        ends_at: Option<DateTime<Utc>>,
        labels: &[String],
        created_by: i64,
    ) -> Result<(Poll, Vec<PollOption>), CommunityError> {
        let mut tx = self.pool.begin().await?;

        let poll = sqlx::query_as::<_, Poll>(&format!(
            r#"
            INSERT INTO polls (title, description, allow_multiple, ends_at, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(description)
        .bind(allow_multiple)
        .bind(ends_at)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let positions: Vec<i32> = (0..labels.len() as i32).collect();
        let options = sqlx::query_as::<_, PollOption>(
            r#"
            INSERT INTO poll_options (poll_id, label, position)
            SELECT $1, label, position FROM UNNEST($2::TEXT[], $3::INT[]) AS t(label, position)
            RETURNING id, poll_id, label, position, vote_count
            "#,
        )
        .bind(poll.id)
        .bind(labels)
        .bind(&positions)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((poll, options))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Poll>, CommunityError> {
        let poll = sqlx::query_as::<_, Poll>(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(poll)
    }

    pub async fn get(&self, id: i64) -> Result<Poll, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::PollNotFound { poll_id: id })
    }

    pub async fn options(&self, poll_id: i64) -> Result<Vec<PollOption>, CommunityError> {
        let mut conn = self.pool.acquire().await?;
        options_in(&mut conn, poll_id).await
    }

    pub async fn update(&self, id: i64, request: UpdatePollRequest) -> Result<Poll, CommunityError> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            r#"
            UPDATE polls
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                ends_at = COALESCE($4, ends_at),
                updated_at = $5
            WHERE id = $1
            RETURNING {POLL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.ends_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        poll.ok_or(CommunityError::PollNotFound { poll_id: id })
    }

    pub async fn close(&self, id: i64) -> Result<Poll, CommunityError> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            "UPDATE polls SET is_closed = TRUE, updated_at = $2 WHERE id = $1 RETURNING {POLL_COLUMNS}"
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        poll.ok_or(CommunityError::PollNotFound { poll_id: id })
    }

    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Newest polls first
    pub async fn list(
        &self,
        filter: &PollFilter,
        now: DateTime<Utc>,
        params: PageParams,
    ) -> Result<(Vec<Poll>, i64), CommunityError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM polls WHERE 1=1");
        push_poll_filters(&mut count_query, filter, now);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {POLL_COLUMNS} FROM polls WHERE 1=1"));
        push_poll_filters(&mut query, filter, now);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let polls = query.build_query_as::<Poll>().fetch_all(&self.pool).await?;

        Ok((polls, total))
    }

    pub async fn count_open(&self, now: DateTime<Utc>) -> Result<i64, CommunityError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM polls WHERE NOT is_closed AND (ends_at IS NULL OR ends_at > $1)",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Option ids the user picked in this poll
    pub async fn user_votes(&self, poll_id: i64, user_id: i64) -> Result<Vec<i64>, CommunityError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT option_id FROM poll_votes WHERE poll_id = $1 AND user_id = $2 ORDER BY option_id")
                .bind(poll_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn total_voters(&self, poll_id: i64) -> Result<i64, CommunityError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT user_id) FROM poll_votes WHERE poll_id = $1")
            .bind(poll_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Record a ballot and bump option counts in one transaction
    pub async fn record_vote(
        &self,
        poll_id: i64,
        user_id: i64,
        option_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, CommunityError> {
        let mut tx = self.pool.begin().await?;

        let poll = sqlx::query_as::<_, Poll>(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = $1 FOR UPDATE"))
            .bind(poll_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CommunityError::PollNotFound { poll_id })?;

        let options = options_in(&mut tx, poll_id).await?;
        let selected = poll.validate_selection(&options, option_ids, now)?;

        let (already_voted,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM poll_votes WHERE poll_id = $1 AND user_id = $2)")
                .bind(poll_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if already_voted {
            return Err(CommunityError::Conflict("You have already voted in this poll".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO poll_votes (poll_id, option_id, user_id, created_at)
            SELECT $1, option_id, $2, $3 FROM UNNEST($4::BIGINT[]) AS t(option_id)
            "#,
        )
        .bind(poll_id)
        .bind(user_id)
        .bind(now)
        .bind(&selected)
        .execute(&mut *tx)
        .await
        .map_err(|e| CommunityError::from_db(e, "You have already voted in this poll"))?;

        sqlx::query("UPDATE poll_options SET vote_count = vote_count + 1 WHERE poll_id = $1 AND id = ANY($2)")
            .bind(poll_id)
            .bind(&selected)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(selected)
    }
}

async fn options_in(conn: &mut PgConnection, poll_id: i64) -> Result<Vec<PollOption>, CommunityError> {
    let options = sqlx::query_as::<_, PollOption>(
        "SELECT id, poll_id, label, position, vote_count FROM poll_options WHERE poll_id = $1 ORDER BY position, id",
    )
    .bind(poll_id)
    .fetch_all(conn)
    .await?;

    Ok(options)
}

fn push_poll_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &PollFilter, now: DateTime<Utc>) {
    if filter.open_only.unwrap_or(false) {
        query
            .push(" AND NOT is_closed AND (ends_at IS NULL OR ends_at > ")
            .push_bind(now)
            .push(")");
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query.push(" AND title ILIKE ").push_bind(contains_pattern(q));
    }
}
