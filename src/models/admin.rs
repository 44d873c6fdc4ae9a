//! Admin model: roles, activity logs, configurable enums and dashboard stats

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::approval::ApprovalStats;
use super::permission::Permissions;

pub const SUPER_ADMIN_ROLE: &str = "super_admin";
pub const MEMBER_ROLE: &str = "member";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub permissions: i64,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn permission_set(&self) -> Permissions {
        Permissions::from_bits_truncate(self.permissions)
    }

    pub fn is_super_admin(&self) -> bool {
        self.name == SUPER_ADMIN_ROLE
    }
}

/// Role with its permission names and the number of users holding it
#[derive(Debug, Clone, Serialize)]
pub struct RoleView {
    #[serde(flatten)]
    pub role: Role,
    pub permission_names: Vec<&'static str>,
    pub user_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permissions: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<i64>,
}

/// Audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub actor_name: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub actor_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
}

impl NewActivityLog {
    pub fn new(actor_id: Option<i64>, action: &str, entity_type: &str, entity_id: Option<i64>) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogFilter {
    pub actor_id: Option<i64>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Admin-managed lookup value such as a family relationship
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnumValue {
    pub id: i64,
    pub enum_type: String,
    pub value: String,
    pub label: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEnumRequest {
    pub enum_type: String,
    /// Derived from `label` when omitted
    pub value: Option<String>,
    pub label: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEnumRequest {
    pub label: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnumFilter {
    #[serde(rename = "type")]
    pub enum_type: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users: ApprovalStats,
    pub family_members: ApprovalStats,
    pub upcoming_events: i64,
    pub open_polls: i64,
    pub flagged_comments: i64,
}

/// Activity log action names
pub mod actions {
    pub const USER_REGISTERED: &str = "user.registered";
    pub const USER_LOGGED_IN: &str = "user.logged_in";
    pub const USER_PASSWORD_CHANGED: &str = "user.password_changed";
    pub const USER_UPDATED: &str = "user.updated";
    pub const USER_APPROVED: &str = "user.approved";
    pub const USER_REJECTED: &str = "user.rejected";
    pub const USER_DEACTIVATED: &str = "user.deactivated";
    pub const USER_ROLE_ASSIGNED: &str = "user.role_assigned";
    pub const PRIMARY_TRANSFERRED: &str = "user.primary_transferred";
    pub const FAMILY_MEMBER_CREATED: &str = "family_member.created";
    pub const FAMILY_MEMBER_UPDATED: &str = "family_member.updated";
    pub const FAMILY_MEMBER_DELETED: &str = "family_member.deleted";
    pub const FAMILY_MEMBER_APPROVED: &str = "family_member.approved";
    pub const FAMILY_MEMBER_REJECTED: &str = "family_member.rejected";
    pub const EVENT_CREATED: &str = "event.created";
    pub const EVENT_UPDATED: &str = "event.updated";
    pub const EVENT_CANCELLED: &str = "event.cancelled";
    pub const EVENT_DELETED: &str = "event.deleted";
    pub const POLL_CREATED: &str = "poll.created";
    pub const POLL_UPDATED: &str = "poll.updated";
    pub const POLL_CLOSED: &str = "poll.closed";
    pub const POLL_DELETED: &str = "poll.deleted";
    pub const COMMENT_DELETED: &str = "comment.deleted";
    pub const COMMENT_HIDDEN: &str = "comment.hidden";
    pub const COMMENT_UNHIDDEN: &str = "comment.unhidden";
    pub const ROLE_CREATED: &str = "role.created";
    pub const ROLE_UPDATED: &str = "role.updated";
    pub const ROLE_DELETED: &str = "role.deleted";
    pub const ENUM_CREATED: &str = "enum.created";
    pub const ENUM_UPDATED: &str = "enum.updated";
    pub const ENUM_DELETED: &str = "enum.deleted";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_permission_set() {
        let role = Role {
            id: 3,
            name: "moderator".to_string(),
            description: None,
            permissions: Permissions::VIEW_MEMBERS.bits()
                | Permissions::MODERATE_COMMENTS.bits()
                | (1 << 40),
            is_system: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let set = role.permission_set();
        assert!(set.contains(Permissions::MODERATE_COMMENTS));
        assert!(!set.contains(Permissions::MANAGE_ROLES));
        assert!(!role.is_super_admin());
    }

    #[test]
    fn test_new_activity_log_defaults_to_empty_details() {
        let log = NewActivityLog::new(Some(1), actions::USER_APPROVED, "user", Some(7));
        assert_eq!(log.details, json!({}));

        let log = log.with_details(json!({ "previous": "pending" }));
        assert_eq!(log.details["previous"], "pending");
    }
}
