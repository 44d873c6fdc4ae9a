//! Comment repository implementation

use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashSet;

use crate::models::comment::{Comment, LikeState};
use crate::models::pagination::PageParams;
use crate::utils::errors::CommunityError;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.event_id, c.user_id, (u.first_name || ' ' || u.last_name) AS author_name,
           c.parent_id, c.content, c.like_count, c.flag_count, c.is_hidden, c.hidden_by,
           c.hidden_reason, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

#[derive(Clone, Debug)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        event_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<Comment, CommunityError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (event_id, user_id, parent_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(parent_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, CommunityError> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> Result<Comment, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::CommentNotFound { comment_id: id })
    }

    /// Top-level comments of an event, newest first
    pub async fn list_roots(
        &self,
        event_id: i64,
        include_hidden: bool,
        params: PageParams,
    ) -> Result<(Vec<Comment>, i64), CommunityError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments WHERE event_id = $1 AND parent_id IS NULL AND ($2 OR NOT is_hidden)",
        )
        .bind(event_id)
        .bind(include_hidden)
        .fetch_one(&self.pool)
        .await?;

        let roots = sqlx::query_as::<_, Comment>(&format!(
            r#"{COMMENT_SELECT}
            WHERE c.event_id = $1 AND c.parent_id IS NULL AND ($2 OR NOT c.is_hidden)
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(event_id)
        .bind(include_hidden)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((roots, total))
    }

    /// Replies to the given top-level comments, oldest first
    pub async fn list_replies(&self, root_ids: &[i64], include_hidden: bool) -> Result<Vec<Comment>, CommunityError> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }

        let replies = sqlx::query_as::<_, Comment>(&format!(
            r#"{COMMENT_SELECT}
            WHERE c.parent_id = ANY($1) AND ($2 OR NOT c.is_hidden)
            ORDER BY c.created_at, c.id
            "#
        ))
        .bind(root_ids)
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        Ok(replies)
    }

    /// Which of `comment_ids` the user has liked
    pub async fn liked_ids(&self, user_id: i64, comment_ids: &[i64]) -> Result<HashSet<i64>, CommunityError> {
        if comment_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT comment_id FROM comment_likes WHERE user_id = $1 AND comment_id = ANY($2)")
                .bind(user_id)
                .bind(comment_ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn update_content(&self, id: i64, content: &str) -> Result<Comment, CommunityError> {
        sqlx::query("UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(content)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    /// Delete a comment; replies go with it
    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Like when not yet liked, unlike otherwise
    pub async fn toggle_like(&self, comment_id: i64, user_id: i64) -> Result<LikeState, CommunityError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        // A concurrent toggle may have inserted the like first; it counts once
        let delta: i64 = if removed {
            -1
        } else {
            let inserted = sqlx::query(
                r#"
                INSERT INTO comment_likes (comment_id, user_id, created_at) VALUES ($1, $2, $3)
                ON CONFLICT (comment_id, user_id) DO NOTHING
                "#,
            )
            .bind(comment_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();
            i64::try_from(inserted).unwrap_or(0)
        };

        let (like_count,): (i64,) = sqlx::query_as(
            "UPDATE comments SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1 RETURNING like_count",
        )
        .bind(comment_id)
        .bind(delta)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommunityError::CommentNotFound { comment_id })?;

        tx.commit().await?;

        Ok(LikeState {
            liked: !removed,
            like_count,
        })
    }

    /// Record a flag; a user may flag a comment once
    pub async fn flag(&self, comment_id: i64, user_id: i64, reason: Option<&str>) -> Result<Comment, CommunityError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO comment_flags (comment_id, user_id, reason, created_at) VALUES ($1, $2, $3, $4)")
            .bind(comment_id)
            .bind(user_id)
            .bind(reason)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| CommunityError::from_db(e, "You have already flagged this comment"))?;

        sqlx::query("UPDATE comments SET flag_count = flag_count + 1 WHERE id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get(comment_id).await
    }

    pub async fn set_hidden(
        &self,
        id: i64,
        hidden: bool,
        moderator_id: i64,
        reason: Option<&str>,
    ) -> Result<Comment, CommunityError> {
        sqlx::query(
            r#"
            UPDATE comments
            SET is_hidden = $2,
                hidden_by = CASE WHEN $2 THEN $3 END,
                hidden_reason = CASE WHEN $2 THEN $4 END,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hidden)
        .bind(moderator_id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(id).await
    }

    /// Flagged comments, most flagged first
    pub async fn list_flagged(&self, params: PageParams) -> Result<(Vec<Comment>, i64), CommunityError> {
        let total = self.count_flagged().await?;

        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"{COMMENT_SELECT}
            WHERE c.flag_count > 0
            ORDER BY c.flag_count DESC, c.created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((comments, total))
    }

    pub async fn count_flagged(&self) -> Result<i64, CommunityError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE flag_count > 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
