//! User repository implementation

use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::approval::ApprovalStatus;
use crate::models::pagination::PageParams;
use crate::models::user::{NewUser, UpdateUserRequest, User, UserFilter};
use crate::utils::errors::CommunityError;
use crate::utils::helpers::contains_pattern;

/// Columns selected for [`User`], joined with the role row
pub(crate) const USER_SELECT: &str = r#"
    SELECT u.id, u.first_name, u.last_name, u.email, u.mobile, u.password_hash,
           u.role_id, r.name AS role_name, r.permissions AS role_permissions,
           u.approval_status, u.rejection_reason, u.approved_by, u.approved_at,
           u.sub_family_number, u.is_primary_account, u.gender, u.date_of_birth,
           u.address, u.city, u.occupation, u.is_active, u.last_login_at,
           u.created_at, u.updated_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: NewUser) -> Result<User, CommunityError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (first_name, last_name, email, mobile, password_hash, role_id,
                               approval_status, sub_family_number, is_primary_account, gender,
                               date_of_birth, address, city, occupation, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING id
            "#,
        )
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.email)
        .bind(new_user.mobile)
        .bind(new_user.password_hash)
        .bind(new_user.role_id)
        .bind(new_user.approval_status)
        .bind(new_user.sub_family_number)
        .bind(new_user.is_primary_account)
        .bind(new_user.gender)
        .bind(new_user.date_of_birth)
        .bind(new_user.address)
        .bind(new_user.city)
        .bind(new_user.occupation)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CommunityError::from_db(e, "Email or mobile number is already registered"))?;

        self.get(id).await
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, CommunityError> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by ID or fail with `UserNotFound`
    pub async fn get(&self, id: i64) -> Result<User, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::UserNotFound { user_id: id })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, CommunityError> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>, CommunityError> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.mobile = $1"))
            .bind(mobile)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Whether another user already holds this email
    pub async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, CommunityError> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    /// Whether another user already holds this mobile number
    pub async fn mobile_taken(&self, mobile: &str, exclude_id: Option<i64>) -> Result<bool, CommunityError> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM users WHERE mobile = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(mobile)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    /// Update profile fields; `None` keeps the stored value
    pub async fn update_profile(&self, id: i64, request: UpdateUserRequest) -> Result<User, CommunityError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                mobile = COALESCE($5, mobile),
                gender = COALESCE($6, gender),
                date_of_birth = COALESCE($7, date_of_birth),
                address = COALESCE($8, address),
                city = COALESCE($9, city),
                occupation = COALESCE($10, occupation),
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(request.first_name)
        .bind(request.last_name)
        .bind(request.email)
        .bind(request.mobile)
        .bind(request.gender)
        .bind(request.date_of_birth)
        .bind(request.address)
        .bind(request.city)
        .bind(request.occupation)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| CommunityError::from_db(e, "Email or mobile number is already registered"))?;

        if result.rows_affected() == 0 {
            return Err(CommunityError::UserNotFound { user_id: id });
        }
        self.get(id).await
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), CommunityError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn record_login(&self, id: i64) -> Result<(), CommunityError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Store a new approval status. Approving clears any rejection reason.
    pub async fn set_approval(
        &self,
        id: i64,
        status: ApprovalStatus,
        reason: Option<&str>,
        decided_by: i64,
    ) -> Result<User, CommunityError> {
        sqlx::query(
            r#"
            UPDATE users
            SET approval_status = $2,
                rejection_reason = $3,
                approved_by = CASE WHEN $2 = 'approved'::approval_status THEN $4 ELSE approved_by END,
                approved_at = CASE WHEN $2 = 'approved'::approval_status THEN $5 ELSE approved_at END,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .bind(decided_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<User, CommunityError> {
        sqlx::query("UPDATE users SET is_active = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    pub async fn set_role(&self, id: i64, role_id: i64) -> Result<User, CommunityError> {
        sqlx::query("UPDATE users SET role_id = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(role_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    /// Search the member directory. With `approved_only`, pending, rejected
    /// and deactivated users are hidden regardless of the filter.
    pub async fn list(
        &self,
        filter: &UserFilter,
        approved_only: bool,
        params: PageParams,
    ) -> Result<(Vec<User>, i64), CommunityError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE 1=1");
        push_user_filters(&mut count_query, filter, approved_only);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(USER_SELECT);
        query.push(" WHERE 1=1");
        push_user_filters(&mut query, filter, approved_only);
        query
            .push(" ORDER BY u.last_name, u.first_name, u.id LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Count users per approval status
    pub async fn count_by_status(&self) -> Result<Vec<(ApprovalStatus, i64)>, CommunityError> {
        let rows = sqlx::query_as::<_, (ApprovalStatus, i64)>(
            "SELECT approval_status, COUNT(*) FROM users GROUP BY approval_status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Current primary account of a sub-family
    pub async fn find_primary(&self, sub_family_number: &str) -> Result<Option<User>, CommunityError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_SELECT} WHERE u.sub_family_number = $1 AND u.is_primary_account"
        ))
        .bind(sub_family_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn count_with_role(&self, role_id: i64) -> Result<i64, CommunityError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Set or clear the primary flag inside a transaction
    pub(crate) async fn set_primary_in(
        conn: &mut PgConnection,
        id: i64,
        is_primary: bool,
        sub_family_number: &str,
    ) -> Result<(), CommunityError> {
        sqlx::query(
            "UPDATE users SET is_primary_account = $2, sub_family_number = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(is_primary)
        .bind(sub_family_number)
        .bind(Utc::now())
        .execute(conn)
        .await
        .map_err(|e| CommunityError::from_db(e, "Sub-family already has a primary account"))?;

        Ok(())
    }
}

fn push_user_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter, approved_only: bool) {
    if approved_only {
        query.push(" AND u.approval_status = 'approved' AND u.is_active");
    } else {
        if let Some(status) = filter.status {
            query.push(" AND u.approval_status = ").push_bind(status);
        }
        if !filter.include_inactive.unwrap_or(false) {
            query.push(" AND u.is_active");
        }
    }

    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        query
            .push(" AND (u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR (u.first_name || ' ' || u.last_name) ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.mobile ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        query.push(" AND u.city ILIKE ").push_bind(city.to_string());
    }
    if let Some(sub_family) = filter.sub_family_number.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND u.sub_family_number = ").push_bind(sub_family.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_restrict_directory_for_members() {
        let filter = UserFilter {
            status: Some(ApprovalStatus::Pending),
            ..Default::default()
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE 1=1");
        push_user_filters(&mut query, &filter, true);
        let sql = query.sql();
        assert!(sql.contains("u.approval_status = 'approved'"));
        assert!(!sql.contains("$1"));
    }

    #[test]
    fn test_search_binds_every_column() {
        let filter = UserFilter {
            q: Some("patel".to_string()),
            city: Some("Pune".to_string()),
            ..Default::default()
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE 1=1");
        push_user_filters(&mut query, &filter, false);
        let sql = query.sql();
        assert!(sql.contains("u.mobile ILIKE $5"));
        assert!(sql.contains("u.city ILIKE $6"));
        assert!(sql.contains("u.is_active"));
    }
}
