//! Family member repository implementation

use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::approval::ApprovalStatus;
use crate::models::family::{FamilyMember, FamilyMemberFilter, NewFamilyMember, UpdateFamilyMemberRequest};
use crate::models::pagination::PageParams;
use crate::utils::errors::CommunityError;
use crate::utils::helpers::contains_pattern;

const MEMBER_COLUMNS: &str = r#"
    id, sub_family_number, primary_user_id, first_name, last_name, relationship, gender,
    date_of_birth, mobile, occupation, approval_status, rejection_reason, approved_by,
    approved_at, created_by, created_at, updated_at
"#;

#[derive(Clone, Debug)]
pub struct FamilyMemberRepository {
    pool: PgPool,
}

impl FamilyMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, member: NewFamilyMember) -> Result<FamilyMember, CommunityError> {
        let created = sqlx::query_as::<_, FamilyMember>(&format!(
            r#"
            INSERT INTO family_members (sub_family_number, primary_user_id, first_name, last_name,
                                        relationship, gender, date_of_birth, mobile, occupation,
                                        approval_status, approved_by, approved_at, created_by,
                                        created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    CASE WHEN $10 = 'approved'::approval_status THEN $11 END,
                    CASE WHEN $10 = 'approved'::approval_status THEN $12 END,
                    $11, $12, $12)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(member.sub_family_number)
        .bind(member.primary_user_id)
        .bind(member.first_name)
        .bind(member.last_name)
        .bind(member.relationship)
        .bind(member.gender)
        .bind(member.date_of_birth)
        .bind(member.mobile)
        .bind(member.occupation)
        .bind(member.approval_status)
        .bind(member.created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<FamilyMember>, CommunityError> {
        let member = sqlx::query_as::<_, FamilyMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM family_members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn get(&self, id: i64) -> Result<FamilyMember, CommunityError> {
        self.find_by_id(id)
            .await?
            .ok_or(CommunityError::FamilyMemberNotFound { member_id: id })
    }

    /// All members of one sub-family, oldest first
    pub async fn list_by_sub_family(&self, sub_family_number: &str) -> Result<Vec<FamilyMember>, CommunityError> {
        let members = sqlx::query_as::<_, FamilyMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM family_members WHERE sub_family_number = $1 ORDER BY created_at, id"
        ))
        .bind(sub_family_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    pub async fn list(
        &self,
        filter: &FamilyMemberFilter,
        params: PageParams,
    ) -> Result<(Vec<FamilyMember>, i64), CommunityError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM family_members WHERE 1=1");
        push_member_filters(&mut count_query, filter);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {MEMBER_COLUMNS} FROM family_members WHERE 1=1"));
        push_member_filters(&mut query, filter);
        query
            .push(" ORDER BY sub_family_number, created_at, id LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let members = query.build_query_as::<FamilyMember>().fetch_all(&self.pool).await?;

        Ok((members, total))
    }

    /// Apply an edit; `status` replaces the approval status when set
    pub async fn update(
        &self,
        id: i64,
        request: UpdateFamilyMemberRequest,
        status: Option<ApprovalStatus>,
    ) -> Result<FamilyMember, CommunityError> {
        let member = sqlx::query_as::<_, FamilyMember>(&format!(
            r#"
            UPDATE family_members
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                relationship = COALESCE($4, relationship),
                gender = COALESCE($5, gender),
                date_of_birth = COALESCE($6, date_of_birth),
                mobile = COALESCE($7, mobile),
                occupation = COALESCE($8, occupation),
                approval_status = COALESCE($9, approval_status),
                updated_at = $10
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.first_name)
        .bind(request.last_name)
        .bind(request.relationship)
        .bind(request.gender)
        .bind(request.date_of_birth)
        .bind(request.mobile)
        .bind(request.occupation)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        member.ok_or(CommunityError::FamilyMemberNotFound { member_id: id })
    }

    pub async fn set_approval(
        &self,
        id: i64,
        status: ApprovalStatus,
        reason: Option<&str>,
        decided_by: i64,
    ) -> Result<FamilyMember, CommunityError> {
        let member = sqlx::query_as::<_, FamilyMember>(&format!(
            r#"
            UPDATE family_members
            SET approval_status = $2,
                rejection_reason = $3,
                approved_by = CASE WHEN $2 = 'approved'::approval_status THEN $4 ELSE approved_by END,
                approved_at = CASE WHEN $2 = 'approved'::approval_status THEN $5 ELSE approved_at END,
                updated_at = $5
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(reason)
        .bind(decided_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        member.ok_or(CommunityError::FamilyMemberNotFound { member_id: id })
    }

    pub async fn delete(&self, id: i64) -> Result<bool, CommunityError> {
        let result = sqlx::query("DELETE FROM family_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_status(&self) -> Result<Vec<(ApprovalStatus, i64)>, CommunityError> {
        let rows = sqlx::query_as::<_, (ApprovalStatus, i64)>(
            "SELECT approval_status, COUNT(*) FROM family_members GROUP BY approval_status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Re-point members at a new primary account and sub-family
    pub(crate) async fn reassign_in(
        conn: &mut PgConnection,
        member_ids: &[i64],
        primary_user_id: i64,
        sub_family_number: &str,
    ) -> Result<u64, CommunityError> {
        let result = sqlx::query(
            r#"
            UPDATE family_members
            SET primary_user_id = $2, sub_family_number = $3, updated_at = $4
            WHERE id = ANY($1)
            "#,
        )
        .bind(member_ids)
        .bind(primary_user_id)
        .bind(sub_family_number)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

fn push_member_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &FamilyMemberFilter) {
    if let Some(status) = filter.status {
        query.push(" AND approval_status = ").push_bind(status);
    }
    if let Some(sub_family) = filter.sub_family_number.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND sub_family_number = ").push_bind(sub_family.to_string());
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = contains_pattern(q);
        query
            .push(" AND (first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR mobile ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
