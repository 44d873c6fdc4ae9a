//! Family member service implementation
//!
//! Primary accounts manage the dependents of their own sub-family; holders of
//! `MANAGE_FAMILY` can see and manage every sub-family.

use serde_json::json;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::approval::{ApprovalAction, ApprovalStatus, Transition};
use crate::models::family::{
    CreateFamilyMemberRequest, FamilyMember, FamilyMemberFilter, NewFamilyMember, UpdateFamilyMemberRequest,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::Permissions;
use crate::services::auth::AuthContext;
use crate::services::user::require_reason;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{clean_optional, normalize_mobile, slugify, validate_name};

pub const RELATIONSHIP_ENUM: &str = "relationship";

#[derive(Clone)]
pub struct FamilyService {
    db: DatabaseService,
}

impl FamilyService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        ctx: &AuthContext,
        mut filter: FamilyMemberFilter,
        params: PageParams,
    ) -> Result<Page<FamilyMember>> {
        if !ctx.has(Permissions::MANAGE_FAMILY) {
            filter.sub_family_number = Some(ctx.user.sub_family_number.clone());
        }

        let (members, total) = self.db.family_members.list(&filter, params).await?;
        Ok(Page::new(members, total, params))
    }

    pub async fn get(&self, ctx: &AuthContext, member_id: i64) -> Result<FamilyMember> {
        let member = self.db.family_members.get(member_id).await?;
        if member.sub_family_number != ctx.user.sub_family_number && !ctx.has(Permissions::MANAGE_FAMILY) {
            return Err(CommunityError::FamilyMemberNotFound { member_id });
        }
        Ok(member)
    }

    pub async fn create(&self, ctx: &AuthContext, request: CreateFamilyMemberRequest) -> Result<FamilyMember> {
        let is_admin = ctx.has(Permissions::MANAGE_FAMILY);

        let requested_sub_family = clean_optional(request.sub_family_number);
        let (sub_family_number, primary_user_id) = match requested_sub_family {
            Some(sub_family) if is_admin => {
                let primary = self.db.users.find_primary(&sub_family).await?.ok_or_else(|| {
                    CommunityError::InvalidInput(format!("Sub-family {} has no primary account", sub_family))
                })?;
                (sub_family, primary.id)
            }
            Some(sub_family) if sub_family != ctx.user.sub_family_number => {
                return Err(CommunityError::PermissionDenied(
                    "You can only add members to your own sub-family".to_string(),
                ))
            }
            _ => {
                if !ctx.user.is_primary_account {
                    return Err(CommunityError::PermissionDenied(
                        "Only the primary account can add family members".to_string(),
                    ));
                }
                (ctx.user.sub_family_number.clone(), ctx.user_id())
            }
        };

        let new_member = NewFamilyMember {
            sub_family_number,
            primary_user_id,
            first_name: validate_name("first_name", &request.first_name).map_err(CommunityError::InvalidInput)?,
            last_name: validate_name("last_name", &request.last_name).map_err(CommunityError::InvalidInput)?,
            relationship: self.validate_relationship(&request.relationship).await?,
            gender: clean_optional(request.gender),
            date_of_birth: request.date_of_birth,
            mobile: optional_mobile(request.mobile)?,
            occupation: clean_optional(request.occupation),
            approval_status: if is_admin {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Pending
            },
            created_by: ctx.user_id(),
        };

        let member = self.db.family_members.create(new_member).await?;
        info!(
            member_id = member.id,
            sub_family = %member.sub_family_number,
            actor_id = ctx.user_id(),
            "Family member created"
        );
        self.db
            .log_activity(
                NewActivityLog::new(
                    Some(ctx.user_id()),
                    actions::FAMILY_MEMBER_CREATED,
                    "family_member",
                    Some(member.id),
                )
                .with_details(json!({ "sub_family_number": member.sub_family_number })),
            )
            .await;
        Ok(member)
    }

    /// Owner edits of an approved record send it back for approval
    pub async fn update(
        &self,
        ctx: &AuthContext,
        member_id: i64,
        request: UpdateFamilyMemberRequest,
    ) -> Result<FamilyMember> {
        let member = self.db.family_members.get(member_id).await?;
        let is_admin = ctx.has(Permissions::MANAGE_FAMILY);
        if !is_admin && member.primary_user_id != ctx.user_id() {
            return Err(CommunityError::PermissionDenied(
                "Only the primary account can edit this family member".to_string(),
            ));
        }

        let mut cleaned = UpdateFamilyMemberRequest {
            gender: clean_optional(request.gender),
            date_of_birth: request.date_of_birth,
            mobile: optional_mobile(request.mobile)?,
            occupation: clean_optional(request.occupation),
            ..Default::default()
        };
        if let Some(first_name) = request.first_name {
            cleaned.first_name = Some(validate_name("first_name", &first_name).map_err(CommunityError::InvalidInput)?);
        }
        if let Some(last_name) = request.last_name {
            cleaned.last_name = Some(validate_name("last_name", &last_name).map_err(CommunityError::InvalidInput)?);
        }
        if let Some(relationship) = request.relationship {
            cleaned.relationship = Some(self.validate_relationship(&relationship).await?);
        }

        let status = (!is_admin && member.approval_status == ApprovalStatus::Approved).then_some(ApprovalStatus::Pending);
        let updated = self.db.family_members.update(member_id, cleaned, status).await?;

        self.db
            .log_activity(
                NewActivityLog::new(
                    Some(ctx.user_id()),
                    actions::FAMILY_MEMBER_UPDATED,
                    "family_member",
                    Some(member_id),
                )
                .with_details(json!({ "status": updated.approval_status })),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, ctx: &AuthContext, member_id: i64) -> Result<()> {
        let member = self.db.family_members.get(member_id).await?;
        if !ctx.has(Permissions::MANAGE_FAMILY) && member.primary_user_id != ctx.user_id() {
            return Err(CommunityError::PermissionDenied(
                "Only the primary account can remove this family member".to_string(),
            ));
        }

        self.db.family_members.delete(member_id).await?;
        info!(member_id = member_id, actor_id = ctx.user_id(), "Family member deleted");
        self.db
            .log_activity(
                NewActivityLog::new(
                    Some(ctx.user_id()),
                    actions::FAMILY_MEMBER_DELETED,
                    "family_member",
                    Some(member_id),
                )
                .with_details(json!({ "sub_family_number": member.sub_family_number })),
            )
            .await;
        Ok(())
    }

    pub async fn approve(&self, ctx: &AuthContext, member_id: i64) -> Result<FamilyMember> {
        self.decide(ctx, member_id, ApprovalAction::Approve, None).await
    }

    pub async fn reject(&self, ctx: &AuthContext, member_id: i64, reason: &str) -> Result<FamilyMember> {
        let reason = require_reason(reason)?;
        self.decide(ctx, member_id, ApprovalAction::Reject, Some(reason)).await
    }

    async fn decide(
        &self,
        ctx: &AuthContext,
        member_id: i64,
        action: ApprovalAction,
        reason: Option<String>,
    ) -> Result<FamilyMember> {
        ctx.require(Permissions::MANAGE_FAMILY)?;
        let member = self.db.family_members.get(member_id).await?;

        let next = match member.approval_status.apply(action) {
            Transition::Unchanged => {
                debug!(member_id = member_id, status = %member.approval_status, "Approval unchanged");
                return Ok(member);
            }
            Transition::Changed(next) => next,
        };

        let updated = self
            .db
            .family_members
            .set_approval(member_id, next, reason.as_deref(), ctx.user_id())
            .await?;

        let action_name = match next {
            ApprovalStatus::Rejected => actions::FAMILY_MEMBER_REJECTED,
            _ => actions::FAMILY_MEMBER_APPROVED,
        };
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), action_name, "family_member", Some(member_id))
                    .with_details(json!({
                        "from": member.approval_status,
                        "to": next,
                        "reason": reason,
                    })),
            )
            .await;
        Ok(updated)
    }

    /// Relationships must match a configured value when any are configured
    async fn validate_relationship(&self, relationship: &str) -> Result<String> {
        let value = slugify(relationship);
        if value.is_empty() {
            return Err(CommunityError::InvalidInput("Relationship is required".to_string()));
        }

        let allowed = self.db.enum_values.active_values(RELATIONSHIP_ENUM).await?;
        if !allowed.is_empty() && !allowed.iter().any(|v| *v == value) {
            return Err(CommunityError::InvalidInput(format!(
                "Unknown relationship '{}'; expected one of: {}",
                relationship.trim(),
                allowed.join(", ")
            )));
        }
        Ok(value)
    }
}

fn optional_mobile(mobile: Option<String>) -> Result<Option<String>> {
    match clean_optional(mobile) {
        Some(raw) => normalize_mobile(&raw)
            .map(Some)
            .ok_or_else(|| CommunityError::InvalidInput("Invalid mobile number".to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_mobile() {
        assert_eq!(optional_mobile(None).ok(), Some(None));
        assert_eq!(optional_mobile(Some("  ".to_string())).ok(), Some(None));
        assert!(optional_mobile(Some("12".to_string())).is_err());
        assert!(matches!(optional_mobile(Some("+91 98765 43210".to_string())), Ok(Some(_))));
    }
}
