//! Admin service implementation
//!
//! Roles, the permission catalogue, activity logs, configurable enums and the
//! dashboard summary.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::database::DatabaseService;
use crate::models::admin::{
    actions, ActivityLog, ActivityLogFilter, CreateEnumRequest, CreateRoleRequest, DashboardStats, EnumFilter,
    EnumValue, NewActivityLog, Role, RoleView, UpdateEnumRequest, UpdateRoleRequest,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::{catalogue, PermissionInfo, Permissions};
use crate::services::auth::AuthContext;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{clean_optional, is_valid_slug, normalize_whitespace, slugify};
use crate::utils::logging::log_admin_action;

#[derive(Clone)]
pub struct AdminService {
    db: DatabaseService,
}

impl AdminService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn dashboard_stats(&self, ctx: &AuthContext) -> Result<DashboardStats> {
        ctx.require(Permissions::VIEW_ACTIVITY_LOGS)?;
        self.db.dashboard_stats(Utc::now()).await
    }

    pub fn permission_catalogue(&self, ctx: &AuthContext) -> Result<Vec<PermissionInfo>> {
        ctx.require(Permissions::MANAGE_ROLES)?;
        Ok(catalogue())
    }

    pub async fn list_roles(&self, ctx: &AuthContext) -> Result<Vec<RoleView>> {
        ctx.require(Permissions::MANAGE_ROLES)?;
        let roles = self.db.roles.list_with_counts().await?;

        Ok(roles
            .into_iter()
            .map(|(role, user_count)| RoleView {
                permission_names: role.permission_set().names(),
                role,
                user_count,
            })
            .collect())
    }

    pub async fn create_role(&self, ctx: &AuthContext, request: CreateRoleRequest) -> Result<Role> {
        ctx.require(Permissions::MANAGE_ROLES)?;

        let name = validate_role_name(&request.name)?;
        let permissions = self.grantable(ctx, request.permissions)?;
        let description = clean_optional(request.description);

        let role = self
            .db
            .roles
            .create(&name, description.as_deref(), permissions.bits())
            .await?;

        log_admin_action(ctx.user_id(), "create_role", Some(&role.name), None);
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ROLE_CREATED, "role", Some(role.id))
                    .with_details(json!({ "name": role.name, "permissions": permissions.names() })),
            )
            .await;
        Ok(role)
    }

    /// System roles keep their names; the super admin role keeps every bit
    pub async fn update_role(&self, ctx: &AuthContext, role_id: i64, request: UpdateRoleRequest) -> Result<Role> {
        ctx.require(Permissions::MANAGE_ROLES)?;
        let role = self.db.roles.get(role_id).await?;

        let name = match request.name {
            Some(name) => {
                let name = validate_role_name(&name)?;
                if role.is_system && name != role.name {
                    return Err(CommunityError::InvalidInput("System roles cannot be renamed".to_string()));
                }
                Some(name)
            }
            None => None,
        };
        let permissions = match request.permissions {
            Some(bits) => {
                if role.is_super_admin() && bits != Permissions::ALL.bits() {
                    return Err(CommunityError::InvalidInput(
                        "The super admin role always holds every permission".to_string(),
                    ));
                }
                Some(self.grantable(ctx, bits)?.bits())
            }
            None => None,
        };
        let description = clean_optional(request.description);

        let updated = self
            .db
            .roles
            .update(role_id, name.as_deref(), description.as_deref(), permissions)
            .await?;

        log_admin_action(ctx.user_id(), "update_role", Some(&updated.name), None);
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ROLE_UPDATED, "role", Some(role_id)).with_details(
                    json!({
                        "from": { "name": role.name, "permissions": role.permissions },
                        "to": { "name": updated.name, "permissions": updated.permissions },
                    }),
                ),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete_role(&self, ctx: &AuthContext, role_id: i64) -> Result<()> {
        ctx.require(Permissions::MANAGE_ROLES)?;
        let role = self.db.roles.get(role_id).await?;

        if role.is_system {
            return Err(CommunityError::InvalidInput("System roles cannot be deleted".to_string()));
        }
        let in_use = self.db.users.count_with_role(role_id).await?;
        if in_use > 0 {
            return Err(CommunityError::Conflict(format!(
                "Role '{}' is still assigned to {} user(s)",
                role.name, in_use
            )));
        }

        self.db.roles.delete(role_id).await?;
        log_admin_action(ctx.user_id(), "delete_role", Some(&role.name), None);
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ROLE_DELETED, "role", Some(role_id))
                    .with_details(json!({ "name": role.name })),
            )
            .await;
        Ok(())
    }

    /// Known bits the caller holds; super admins may grant anything known
    fn grantable(&self, ctx: &AuthContext, bits: i64) -> Result<Permissions> {
        let permissions = Permissions::from_bits(bits)
            .ok_or_else(|| CommunityError::InvalidInput(format!("Unknown permission bits in {}", bits)))?;
        if !ctx.is_super_admin() && !ctx.permissions.contains(permissions) {
            return Err(CommunityError::PermissionDenied(
                "You cannot grant permissions you do not hold".to_string(),
            ));
        }
        Ok(permissions)
    }

    pub async fn activity_logs(
        &self,
        ctx: &AuthContext,
        filter: ActivityLogFilter,
        params: PageParams,
    ) -> Result<Page<ActivityLog>> {
        ctx.require(Permissions::VIEW_ACTIVITY_LOGS)?;
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(CommunityError::InvalidInput("'from' must not be after 'to'".to_string()));
            }
        }

        let (logs, total) = self.db.activity_logs.list(&filter, params).await?;
        Ok(Page::new(logs, total, params))
    }

    /// Inactive values are only listed for enum managers
    pub async fn list_enums(&self, ctx: &AuthContext, mut filter: EnumFilter) -> Result<Vec<EnumValue>> {
        if !ctx.has(Permissions::MANAGE_ENUMS) {
            filter.include_inactive = Some(false);
        }
        self.db.enum_values.list(&filter).await
    }

    pub async fn create_enum(&self, ctx: &AuthContext, request: CreateEnumRequest) -> Result<EnumValue> {
        ctx.require(Permissions::MANAGE_ENUMS)?;

        let enum_type = slugify(&request.enum_type);
        if !is_valid_slug(&enum_type) {
            return Err(CommunityError::InvalidInput("Invalid enum type".to_string()));
        }
        let label = normalize_whitespace(&request.label);
        if label.is_empty() {
            return Err(CommunityError::InvalidInput("Label is required".to_string()));
        }
        let value = slugify(request.value.as_deref().unwrap_or(&label));
        if !is_valid_slug(&value) {
            return Err(CommunityError::InvalidInput(format!("Invalid enum value '{}'", value)));
        }

        let created = self
            .db
            .enum_values
            .create(&enum_type, &value, &label, request.sort_order)
            .await?;

        info!(enum_type = %created.enum_type, value = %created.value, "Enum value created");
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ENUM_CREATED, "enum_value", Some(created.id))
                    .with_details(json!({ "enum_type": created.enum_type, "value": created.value })),
            )
            .await;
        Ok(created)
    }

    pub async fn update_enum(&self, ctx: &AuthContext, id: i64, mut request: UpdateEnumRequest) -> Result<EnumValue> {
        ctx.require(Permissions::MANAGE_ENUMS)?;
        if let Some(label) = request.label.as_deref() {
            let label = normalize_whitespace(label);
            if label.is_empty() {
                return Err(CommunityError::InvalidInput("Label is required".to_string()));
            }
            request.label = Some(label);
        }

        let updated = self.db.enum_values.update(id, request).await?;
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ENUM_UPDATED, "enum_value", Some(id))
                    .with_details(json!({ "enum_type": updated.enum_type, "value": updated.value })),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete_enum(&self, ctx: &AuthContext, id: i64) -> Result<()> {
        ctx.require(Permissions::MANAGE_ENUMS)?;
        let value = self.db.enum_values.get(id).await?;

        self.db.enum_values.delete(id).await?;
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::ENUM_DELETED, "enum_value", Some(id))
                    .with_details(json!({ "enum_type": value.enum_type, "value": value.value })),
            )
            .await;
        Ok(())
    }
}

fn validate_role_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if !is_valid_slug(&name) {
        return Err(CommunityError::InvalidInput(
            "Role names use lowercase letters, digits and underscores".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_role_name() {
        assert_eq!(validate_role_name(" Event_Team ").ok(), Some("event_team".to_string()));
        assert!(validate_role_name("event team").is_err());
        assert!(validate_role_name("").is_err());
    }
}
