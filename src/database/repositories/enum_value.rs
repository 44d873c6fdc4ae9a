//! Enum value repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::admin::{EnumFilter, EnumValue, UpdateEnumRequest};
use crate::utils::errors::CommunityError;

const ENUM_COLUMNS: &str = "id, enum_type, value, label, sort_order, is_active, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct EnumValueRepository {
    pool: PgPool,
}

impl EnumValueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &EnumFilter) -> Result<Vec<EnumValue>, CommunityError> {
        let values = sqlx::query_as::<_, EnumValue>(&format!(
            r#"
            SELECT {ENUM_COLUMNS} FROM enum_values
            WHERE ($1::TEXT IS NULL OR enum_type = $1) AND ($2 OR is_active)
            ORDER BY enum_type, sort_order, label
            "#
        ))
        .bind(filter.enum_type.as_deref())
        .bind(filter.include_inactive.unwrap_or(false))
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<EnumValue>, CommunityError> {
        let value = sqlx::query_as::<_, EnumValue>(&format!("SELECT {ENUM_COLUMNS} FROM enum_values WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn get(&self, id: i64) -> Result<EnumValue, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::NotFound { entity: "Enum value", id })
    }

    /// Active values of a type; empty when the type is not configured
    pub async fn active_values(&self, enum_type: &str) -> Result<Vec<String>, CommunityError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT value FROM enum_values WHERE enum_type = $1 AND is_active ORDER BY sort_order")
                .bind(enum_type)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    pub async fn create(
        &self,
        enum_type: &str,
        value: &str,
        label: &str,
        sort_order: i32,
    ) -> Result<EnumValue, CommunityError> {
        let created = sqlx::query_as::<_, EnumValue>(&format!(
            r#"
            INSERT INTO enum_values (enum_type, value, label, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {ENUM_COLUMNS}
            "#
        ))
        .bind(enum_type)
        .bind(value)
        .bind(label)
        .bind(sort_order)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CommunityError::from_db(e, "This value already exists for the enum type"))?;

        Ok(created)
    }

    pub async fn update(&self, id: i64, request: UpdateEnumRequest) -> Result<EnumValue, CommunityError> {
        let updated = sqlx::query_as::<_, EnumValue>(&format!(
            r#"
            UPDATE enum_values
            SET label = COALESCE($2, label),
                sort_order = COALESCE($3, sort_order),
                is_active = COALESCE($4, is_active),
                updated_at = $5
            WHERE id = $1
            RETURNING {ENUM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.label)
        .bind(request.sort_order)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(CommunityError::NotFound { entity: "Enum value", id })
    }

    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM enum_values WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
