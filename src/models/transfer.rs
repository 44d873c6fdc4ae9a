//! Primary account transfer model and planning
//!
//! A transfer moves dependents from one primary account to another user and
//! records the move in a chain of transfer records. [`TransferPlan::build`]
//! checks every precondition without touching the database; the service layer
//! then applies the plan inside a single transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

use super::approval::ApprovalStatus;
use super::family::FamilyMember;
use super::user::User;
use crate::utils::errors::{CommunityError, Result};

/// One link in a sub-family's transfer history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrimaryAccountTransfer {
    pub id: i64,
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub from_sub_family: String,
    pub to_sub_family: String,
    pub family_member_ids: Vec<i64>,
    pub reason: Option<String>,
    pub performed_by: Option<i64>,
    pub previous_transfer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub to_user_id: i64,
    /// Subset of the source sub-family to move; `None` moves everyone
    pub family_member_ids: Option<Vec<i64>>,
    pub reason: Option<String>,
}

/// Validated set of writes for one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub source_user_id: i64,
    pub target_user_id: i64,
    pub from_sub_family: String,
    pub to_sub_family: String,
    pub member_ids: Vec<i64>,
    /// Mark the target as primary account of `to_sub_family`
    pub promote_target: bool,
    /// Clear the source's primary flag (same sub-family hand-over)
    pub demote_source: bool,
}

impl TransferPlan {
    /// Validate a transfer and work out which rows change.
    ///
    /// `target_family_primary` is the id of the current primary account of the
    /// target's sub-family, if any. `source_members` are the family members of
    /// the source's sub-family.
    pub fn build(
        source: &User,
        target: &User,
        target_family_primary: Option<i64>,
        source_members: &[FamilyMember],
        selected: Option<&[i64]>,
    ) -> Result<Self> {
        if source.id == target.id {
            return Err(CommunityError::InvalidInput(
                "Cannot transfer a primary account to itself".to_string(),
            ));
        }
        if !source.is_primary_account {
            return Err(CommunityError::InvalidInput(format!(
                "User {} is not a primary account",
                source.id
            )));
        }
        if !source.is_active {
            return Err(CommunityError::InvalidInput(format!(
                "User {} is deactivated",
                source.id
            )));
        }
        if target.approval_status != ApprovalStatus::Approved || !target.is_active {
            return Err(CommunityError::InvalidInput(format!(
                "User {} must be an approved, active member to receive a transfer",
                target.id
            )));
        }

        let available: BTreeSet<i64> = source_members
            .iter()
            .filter(|m| m.sub_family_number == source.sub_family_number)
            .map(|m| m.id)
            .collect();

        let chosen: BTreeSet<i64> = match selected {
            Some([]) => {
                return Err(CommunityError::InvalidInput(
                    "Select at least one family member to transfer".to_string(),
                ))
            }
            Some(ids) => {
                let chosen: BTreeSet<i64> = ids.iter().copied().collect();
                if let Some(stray) = chosen.iter().find(|id| !available.contains(id)) {
                    return Err(CommunityError::InvalidInput(format!(
                        "Family member {} does not belong to sub-family {}",
                        stray, source.sub_family_number
                    )));
                }
                chosen
            }
            None => available.clone(),
        };

        if target.sub_family_number == source.sub_family_number {
            // Hand-over inside one family: everyone follows the new head.
            return Ok(TransferPlan {
                source_user_id: source.id,
                target_user_id: target.id,
                from_sub_family: source.sub_family_number.clone(),
                to_sub_family: target.sub_family_number.clone(),
                member_ids: available.into_iter().collect(),
                promote_target: true,
                demote_source: true,
            });
        }

        let promote_target = if target.is_primary_account {
            false
        } else {
            match target_family_primary {
                Some(primary_id) if primary_id != target.id => {
                    return Err(CommunityError::Conflict(format!(
                        "Sub-family {} already has primary account {}",
                        target.sub_family_number, primary_id
                    )))
                }
                _ => true,
            }
        };

        if chosen.is_empty() {
            return Err(CommunityError::InvalidInput(format!(
                "Sub-family {} has no family members to transfer",
                source.sub_family_number
            )));
        }

        Ok(TransferPlan {
            source_user_id: source.id,
            target_user_id: target.id,
            from_sub_family: source.sub_family_number.clone(),
            to_sub_family: target.sub_family_number.clone(),
            member_ids: chosen.into_iter().collect(),
            promote_target,
            demote_source: false,
        })
    }

    pub fn is_same_family(&self) -> bool {
        self.from_sub_family == self.to_sub_family
    }
}
