//! Primary account transfer service

use std::time::Instant;

use tracing::info;

use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::permission::Permissions;
use crate::models::transfer::{PrimaryAccountTransfer, TransferPlan, TransferRequest};
use crate::services::auth::AuthContext;
use crate::utils::errors::Result;
use crate::utils::helpers::clean_optional;
use crate::utils::logging::{log_admin_action, log_database_operation};

#[derive(Clone)]
pub struct TransferService {
    db: DatabaseService,
}

impl TransferService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Hand family members (and possibly primary status) from one account to
    /// another
    pub async fn transfer_primary(
        &self,
        ctx: &AuthContext,
        source_user_id: i64,
        request: TransferRequest,
    ) -> Result<PrimaryAccountTransfer> {
        ctx.require(Permissions::TRANSFER_ACCOUNTS)?;

        let source = self.db.users.get(source_user_id).await?;
        let target = self.db.users.get(request.to_user_id).await?;
        let target_family_primary = self
            .db
            .users
            .find_primary(&target.sub_family_number)
            .await?
            .map(|u| u.id);
        let source_members = self
            .db
            .family_members
            .list_by_sub_family(&source.sub_family_number)
            .await?;

        let plan = TransferPlan::build(
            &source,
            &target,
            target_family_primary,
            &source_members,
            request.family_member_ids.as_deref(),
        )?;

        let reason = clean_optional(request.reason);
        let log = NewActivityLog::new(
            Some(ctx.user_id()),
            actions::PRIMARY_TRANSFERRED,
            "user",
            Some(source_user_id),
        );
        let started = Instant::now();
        let applied = self
            .db
            .transfers
            .apply(&plan, reason.as_deref(), ctx.user_id(), log)
            .await;
        log_database_operation(
            "transfer_primary",
            "primary_account_transfers",
            started.elapsed().as_millis() as u64,
            applied.is_ok(),
        );
        let transfer = applied?;

        info!(
            transfer_id = transfer.id,
            from_user_id = plan.source_user_id,
            to_user_id = plan.target_user_id,
            members = plan.member_ids.len(),
            same_family = plan.is_same_family(),
            "Primary account transfer completed"
        );
        log_admin_action(
            ctx.user_id(),
            "transfer_primary",
            Some(&source_user_id.to_string()),
            reason.as_deref(),
        );

        Ok(transfer)
    }

    /// Transfer chain of the user's sub-family, newest first
    pub async fn history(&self, ctx: &AuthContext, user_id: i64) -> Result<Vec<PrimaryAccountTransfer>> {
        ctx.require_self_or(user_id, Permissions::TRANSFER_ACCOUNTS)?;
        let user = self.db.users.get(user_id).await?;
        self.db.transfers.history(&user.sub_family_number).await
    }
}
