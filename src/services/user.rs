//! User service implementation
//!
//! This service handles the member directory, profile management, the
//! approval workflow, role assignment and account deactivation.

use serde_json::json;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::approval::{ApprovalAction, ApprovalStats, ApprovalStatus, Transition};
use crate::models::family::FamilyView;
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::Permissions;
use crate::models::user::{UpdateUserRequest, User, UserFilter};
use crate::services::auth::AuthContext;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{clean_optional, is_valid_email, normalize_email, normalize_mobile, validate_name};
use crate::utils::logging::log_admin_action;

/// Trimmed, non-empty rejection reason
pub(crate) fn require_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CommunityError::InvalidInput(
            "A reason is required when rejecting".to_string(),
        ));
    }
    Ok(reason.to_string())
}

/// User service for managing user operations
#[derive(Clone)]
pub struct UserService {
    db: DatabaseService,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Search the member directory
    pub async fn list(&self, ctx: &AuthContext, filter: UserFilter, params: PageParams) -> Result<Page<User>> {
        ctx.require(Permissions::VIEW_MEMBERS)?;
        let approved_only = !ctx.has(Permissions::APPROVE_USERS);

        let (users, total) = self.db.users.list(&filter, approved_only, params).await?;
        debug!(total = total, page = params.page, "Listed users");
        Ok(Page::new(users, total, params))
    }

    /// Get user by ID. Unapproved accounts are invisible to plain members.
    pub async fn get(&self, ctx: &AuthContext, user_id: i64) -> Result<User> {
        if ctx.user_id() != user_id {
            ctx.require(Permissions::VIEW_MEMBERS)?;
        }
        let user = self.db.users.get(user_id).await?;

        let visible = ctx.user_id() == user_id
            || ctx.has(Permissions::APPROVE_USERS)
            || ctx.has(Permissions::MANAGE_USERS)
            || (user.is_approved() && user.is_active);
        if !visible {
            return Err(CommunityError::UserNotFound { user_id });
        }
        Ok(user)
    }

    /// Update user profile
    pub async fn update_profile(&self, ctx: &AuthContext, user_id: i64, request: UpdateUserRequest) -> Result<User> {
        ctx.require_self_or(user_id, Permissions::MANAGE_USERS)?;
        self.db.users.get(user_id).await?;

        let mut cleaned = UpdateUserRequest {
            gender: clean_optional(request.gender),
            date_of_birth: request.date_of_birth,
            address: clean_optional(request.address),
            city: clean_optional(request.city),
            occupation: clean_optional(request.occupation),
            ..Default::default()
        };
        if let Some(first_name) = request.first_name {
            cleaned.first_name = Some(validate_name("first_name", &first_name).map_err(CommunityError::InvalidInput)?);
        }
        if let Some(last_name) = request.last_name {
            cleaned.last_name = Some(validate_name("last_name", &last_name).map_err(CommunityError::InvalidInput)?);
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            if !is_valid_email(&email) {
                return Err(CommunityError::InvalidInput("Invalid email address".to_string()));
            }
            if self.db.users.email_taken(&email, Some(user_id)).await? {
                return Err(CommunityError::Conflict("Email is already registered".to_string()));
            }
            cleaned.email = Some(email);
        }
        if let Some(mobile) = request.mobile {
            let mobile = normalize_mobile(&mobile)
                .ok_or_else(|| CommunityError::InvalidInput("Invalid mobile number".to_string()))?;
            if self.db.users.mobile_taken(&mobile, Some(user_id)).await? {
                return Err(CommunityError::Conflict("Mobile number is already registered".to_string()));
            }
            cleaned.mobile = Some(mobile);
        }

        let user = self.db.users.update_profile(user_id, cleaned).await?;
        info!(user_id = user_id, actor_id = ctx.user_id(), "User profile updated successfully");

        self.db
            .log_activity(NewActivityLog::new(Some(ctx.user_id()), actions::USER_UPDATED, "user", Some(user_id)))
            .await;
        Ok(user)
    }

    pub async fn deactivate(&self, ctx: &AuthContext, user_id: i64) -> Result<User> {
        ctx.require(Permissions::MANAGE_USERS)?;
        if ctx.user_id() == user_id {
            return Err(CommunityError::InvalidInput(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let user = self.db.users.get(user_id).await?;
        if !user.is_active {
            return Ok(user);
        }

        let user = self.db.users.set_active(user_id, false).await?;
        log_admin_action(ctx.user_id(), "deactivate_user", Some(&user_id.to_string()), None);
        self.db
            .log_activity(NewActivityLog::new(
                Some(ctx.user_id()),
                actions::USER_DEACTIVATED,
                "user",
                Some(user_id),
            ))
            .await;
        Ok(user)
    }

    pub async fn approve(&self, ctx: &AuthContext, user_id: i64) -> Result<User> {
        self.decide(ctx, user_id, ApprovalAction::Approve, None).await
    }

    pub async fn reject(&self, ctx: &AuthContext, user_id: i64, reason: &str) -> Result<User> {
        let reason = require_reason(reason)?;
        self.decide(ctx, user_id, ApprovalAction::Reject, Some(reason)).await
    }

    async fn decide(
        &self,
        ctx: &AuthContext,
        user_id: i64,
        action: ApprovalAction,
        reason: Option<String>,
    ) -> Result<User> {
        ctx.require(Permissions::APPROVE_USERS)?;
        let user = self.db.users.get(user_id).await?;

        let next = match user.approval_status.apply(action) {
            Transition::Unchanged => {
                debug!(user_id = user_id, status = %user.approval_status, "Approval unchanged");
                return Ok(user);
            }
            Transition::Changed(next) => next,
        };

        let updated = self
            .db
            .users
            .set_approval(user_id, next, reason.as_deref(), ctx.user_id())
            .await?;

        let action_name = match next {
            ApprovalStatus::Rejected => actions::USER_REJECTED,
            _ => actions::USER_APPROVED,
        };
        log_admin_action(ctx.user_id(), action.as_str(), Some(&user_id.to_string()), reason.as_deref());
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), action_name, "user", Some(user_id)).with_details(json!({
                    "from": user.approval_status,
                    "to": next,
                    "reason": reason,
                })),
            )
            .await;

        Ok(updated)
    }

    /// Change a user's role. Only a super admin may hand out super admin.
    pub async fn assign_role(&self, ctx: &AuthContext, user_id: i64, role_id: i64) -> Result<User> {
        ctx.require(Permissions::MANAGE_ROLES)?;
        let user = self.db.users.get(user_id).await?;
        let role = self.db.roles.get(role_id).await?;

        if role.is_super_admin() && !ctx.is_super_admin() {
            return Err(CommunityError::PermissionDenied(
                "Only a super admin can grant the super admin role".to_string(),
            ));
        }
        if user.role_name == crate::models::admin::SUPER_ADMIN_ROLE && !ctx.is_super_admin() {
            return Err(CommunityError::PermissionDenied(
                "Only a super admin can change another super admin's role".to_string(),
            ));
        }
        if user.role_id == role_id {
            return Ok(user);
        }

        let updated = self.db.users.set_role(user_id, role_id).await?;
        log_admin_action(ctx.user_id(), "assign_role", Some(&user_id.to_string()), Some(&role.name));
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::USER_ROLE_ASSIGNED, "user", Some(user_id))
                    .with_details(json!({ "from": user.role_name, "to": role.name })),
            )
            .await;
        Ok(updated)
    }

    /// Counts per approval status
    pub async fn approval_stats(&self, ctx: &AuthContext) -> Result<ApprovalStats> {
        ctx.require(Permissions::APPROVE_USERS)?;
        let rows = self.db.users.count_by_status().await?;
        Ok(ApprovalStats::from_counts(&rows))
    }

    /// The user's sub-family: its primary account and family members
    pub async fn family(&self, ctx: &AuthContext, user_id: i64) -> Result<FamilyView> {
        let user = self.get(ctx, user_id).await?;
        if ctx.user.sub_family_number != user.sub_family_number {
            ctx.require(Permissions::VIEW_MEMBERS)?;
        }
        self.db.family_view(&user.sub_family_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reason() {
        assert_eq!(require_reason("  duplicate account ").ok(), Some("duplicate account".to_string()));
        assert!(require_reason("   ").is_err());
        assert!(require_reason("").is_err());
    }
}
