//! Primary account transfer repository implementation

use chrono::Utc;
use sqlx::PgPool;

use super::activity_log::ActivityLogRepository;
use super::family_member::FamilyMemberRepository;
use super::user::UserRepository;
use crate::models::admin::NewActivityLog;
use crate::models::transfer::{PrimaryAccountTransfer, TransferPlan};
use crate::utils::errors::CommunityError;

const TRANSFER_COLUMNS: &str = r#"
    id, from_user_id, to_user_id, from_sub_family, to_sub_family, family_member_ids,
    reason, performed_by, previous_transfer_id, created_at
"#;

#[derive(Clone, Debug)]
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply a validated plan and append the transfer record, all in one
    /// transaction
    pub async fn apply(
        &self,
        plan: &TransferPlan,
        reason: Option<&str>,
        performed_by: i64,
        log: NewActivityLog,
    ) -> Result<PrimaryAccountTransfer, CommunityError> {
        let mut tx = self.pool.begin().await?;

        let locked: Vec<(i64, bool, String)> = sqlx::query_as(
            "SELECT id, is_primary_account, sub_family_number FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![plan.source_user_id, plan.target_user_id])
        .fetch_all(&mut *tx)
        .await?;

        let source_still_primary = locked
            .iter()
            .any(|(id, primary, sub)| *id == plan.source_user_id && *primary && *sub == plan.from_sub_family);
        if !source_still_primary || locked.len() != 2 {
            return Err(CommunityError::Conflict(
                "Accounts changed while the transfer was being prepared".to_string(),
            ));
        }

        let previous: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM primary_account_transfers
            WHERE from_sub_family = $1 OR to_sub_family = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(&plan.from_sub_family)
        .fetch_optional(&mut *tx)
        .await?;

        // The partial unique index allows one primary per sub-family, so the
        // source must be cleared before the target is raised.
        if plan.demote_source {
            UserRepository::set_primary_in(&mut tx, plan.source_user_id, false, &plan.from_sub_family).await?;
        }
        if plan.promote_target {
            UserRepository::set_primary_in(&mut tx, plan.target_user_id, true, &plan.to_sub_family).await?;
        }

        if !plan.member_ids.is_empty() {
            FamilyMemberRepository::reassign_in(&mut tx, &plan.member_ids, plan.target_user_id, &plan.to_sub_family)
                .await?;
        }

        let transfer = sqlx::query_as::<_, PrimaryAccountTransfer>(&format!(
            r#"
            INSERT INTO primary_account_transfers (from_user_id, to_user_id, from_sub_family, to_sub_family,
                                                   family_member_ids, reason, performed_by,
                                                   previous_transfer_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(plan.source_user_id)
        .bind(plan.target_user_id)
        .bind(&plan.from_sub_family)
        .bind(&plan.to_sub_family)
        .bind(&plan.member_ids)
        .bind(reason)
        .bind(performed_by)
        .bind(previous.map(|(id,)| id))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let log = log.with_details(serde_json::json!({
            "transfer_id": transfer.id,
            "to_user_id": plan.target_user_id,
            "from_sub_family": plan.from_sub_family,
            "to_sub_family": plan.to_sub_family,
            "family_member_ids": plan.member_ids,
        }));
        ActivityLogRepository::insert_in(&mut tx, &log).await?;

        tx.commit().await?;

        Ok(transfer)
    }

    /// Every transfer into or out of a sub-family, newest first
    pub async fn history(&self, sub_family_number: &str) -> Result<Vec<PrimaryAccountTransfer>, CommunityError> {
        let transfers = sqlx::query_as::<_, PrimaryAccountTransfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS} FROM primary_account_transfers
            WHERE from_sub_family = $1 OR to_sub_family = $1
            ORDER BY id DESC
            "#
        ))
        .bind(sub_family_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}
