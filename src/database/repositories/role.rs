//! Role repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::admin::Role;
use crate::utils::errors::CommunityError;

const ROLE_COLUMNS: &str = "id, name, description, permissions, is_system, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List roles with the number of users holding each
    pub async fn list_with_counts(&self) -> Result<Vec<(Role, i64)>, CommunityError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            role: Role,
            user_count: i64,
        }

        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT r.id, r.name, r.description, r.permissions, r.is_system, r.created_at, r.updated_at,
                   (SELECT COUNT(*) FROM users u WHERE u.role_id = r.id) AS user_count
            FROM roles r
            ORDER BY r.is_system DESC, r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.role, r.user_count)).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Role>, CommunityError> {
        let role = sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    pub async fn get(&self, id: i64) -> Result<Role, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::NotFound { entity: "Role", id })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, CommunityError> {
        let role = sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        permissions: i64,
    ) -> Result<Role, CommunityError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            INSERT INTO roles (name, description, permissions, is_system, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, $4, $4)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(description)
        .bind(permissions)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CommunityError::from_db(e, "A role with this name already exists"))?;

        Ok(role)
    }

    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        permissions: Option<i64>,
    ) -> Result<Role, CommunityError> {
        let role = sqlx::query_as::<_, Role>(&format!(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                permissions = COALESCE($4, permissions),
                updated_at = $5
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(permissions)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CommunityError::from_db(e, "A role with this name already exists"))?;

        role.ok_or(CommunityError::NotFound { entity: "Role", id })
    }

    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
