//! Activity log repository implementation

use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::admin::{ActivityLog, ActivityLogFilter, NewActivityLog};
use crate::models::pagination::PageParams;
use crate::utils::errors::CommunityError;

#[derive(Clone, Debug)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry
    pub async fn insert(&self, log: &NewActivityLog) -> Result<(), CommunityError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, log).await
    }

    /// Append an entry as part of a larger transaction
    pub(crate) async fn insert_in(conn: &mut PgConnection, log: &NewActivityLog) -> Result<(), CommunityError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (actor_id, action, entity_type, entity_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(log.actor_id)
        .bind(&log.action)
        .bind(&log.entity_type)
        .bind(log.entity_id)
        .bind(&log.details)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Newest entries first
    pub async fn list(
        &self,
        filter: &ActivityLogFilter,
        params: PageParams,
    ) -> Result<(Vec<ActivityLog>, i64), CommunityError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs l WHERE 1=1");
        push_log_filters(&mut count_query, filter);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT l.id, l.actor_id, (u.first_name || ' ' || u.last_name) AS actor_name,
                   l.action, l.entity_type, l.entity_id, l.details, l.created_at
            FROM activity_logs l
            LEFT JOIN users u ON u.id = l.actor_id
            WHERE 1=1
            "#,
        );
        push_log_filters(&mut query, filter);
        query
            .push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let logs = query.build_query_as::<ActivityLog>().fetch_all(&self.pool).await?;

        Ok((logs, total))
    }
}

fn push_log_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ActivityLogFilter) {
    if let Some(actor_id) = filter.actor_id {
        query.push(" AND l.actor_id = ").push_bind(actor_id);
    }
    if let Some(action) = filter.action.as_deref().filter(|a| !a.is_empty()) {
        query.push(" AND l.action = ").push_bind(action.to_string());
    }
    if let Some(entity_type) = filter.entity_type.as_deref().filter(|e| !e.is_empty()) {
        query.push(" AND l.entity_type = ").push_bind(entity_type.to_string());
    }
    if let Some(from) = filter.from {
        query.push(" AND l.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND l.created_at <= ").push_bind(to);
    }
}
