//! Permission bits carried by roles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of permission bits stored in `roles.permissions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(i64);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const VIEW_MEMBERS: Permissions = Permissions(1);
    pub const MANAGE_USERS: Permissions = Permissions(1 << 1);
    pub const APPROVE_USERS: Permissions = Permissions(1 << 2);
    pub const MANAGE_FAMILY: Permissions = Permissions(1 << 3);
    pub const MANAGE_EVENTS: Permissions = Permissions(1 << 4);
    pub const MANAGE_POLLS: Permissions = Permissions(1 << 5);
    pub const MODERATE_COMMENTS: Permissions = Permissions(1 << 6);
    pub const MANAGE_ROLES: Permissions = Permissions(1 << 7);
    pub const VIEW_ACTIVITY_LOGS: Permissions = Permissions(1 << 8);
    pub const MANAGE_ENUMS: Permissions = Permissions(1 << 9);
    pub const TRANSFER_ACCOUNTS: Permissions = Permissions(1 << 10);
    pub const ALL: Permissions = Permissions((1 << 11) - 1);

    pub const fn bits(self) -> i64 {
        self.0
    }

    /// Build from raw bits, rejecting anything outside [`Permissions::ALL`]
    pub const fn from_bits(bits: i64) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Permissions(bits))
        } else {
            None
        }
    }

    /// Build from raw bits, silently dropping unknown bits
    pub const fn from_bits_truncate(bits: i64) -> Self {
        Permissions(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Permissions) -> Self {
        Permissions(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of every bit set, in catalogue order
    pub fn names(self) -> Vec<&'static str> {
        PERMISSION_CATALOGUE
            .iter()
            .filter(|(_, perm)| self.contains(*perm))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(","))
    }
}

/// Every grantable permission with its API name
pub const PERMISSION_CATALOGUE: &[(&str, Permissions)] = &[
    ("view_members", Permissions::VIEW_MEMBERS),
    ("manage_users", Permissions::MANAGE_USERS),
    ("approve_users", Permissions::APPROVE_USERS),
    ("manage_family", Permissions::MANAGE_FAMILY),
    ("manage_events", Permissions::MANAGE_EVENTS),
    ("manage_polls", Permissions::MANAGE_POLLS),
    ("moderate_comments", Permissions::MODERATE_COMMENTS),
    ("manage_roles", Permissions::MANAGE_ROLES),
    ("view_activity_logs", Permissions::VIEW_ACTIVITY_LOGS),
    ("manage_enums", Permissions::MANAGE_ENUMS),
    ("transfer_accounts", Permissions::TRANSFER_ACCOUNTS),
];

/// Catalogue entry as returned by the admin API
#[derive(Debug, Clone, Serialize)]
pub struct PermissionInfo {
    pub name: &'static str,
    pub bit: i64,
}

pub fn catalogue() -> Vec<PermissionInfo> {
    PERMISSION_CATALOGUE
        .iter()
        .map(|(name, perm)| PermissionInfo {
            name: *name,
            bit: perm.bits(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_covers_catalogue() {
        let union = PERMISSION_CATALOGUE
            .iter()
            .fold(Permissions::NONE, |acc, (_, p)| acc | *p);
        assert_eq!(union, Permissions::ALL);
        assert_eq!(Permissions::ALL.bits(), 2047);
    }

    #[test]
    fn test_contains() {
        let moderator = Permissions::VIEW_MEMBERS | Permissions::APPROVE_USERS;
        assert!(moderator.contains(Permissions::APPROVE_USERS));
        assert!(!moderator.contains(Permissions::MANAGE_ROLES));
        assert!(Permissions::ALL.contains(moderator));
        assert!(moderator.contains(Permissions::NONE));
    }

    #[test]
    fn test_from_bits_rejects_unknown() {
        assert_eq!(Permissions::from_bits(5), Some(Permissions(5)));
        assert_eq!(Permissions::from_bits(1 << 20), None);
        assert_eq!(Permissions::from_bits_truncate((1 << 20) | 1), Permissions::VIEW_MEMBERS);
    }

    #[test]
    fn test_names_follow_catalogue_order() {
        let perms = Permissions::MANAGE_POLLS | Permissions::MANAGE_EVENTS;
        assert_eq!(perms.names(), vec!["manage_events", "manage_polls"]);
    }

    #[test]
    fn test_seeded_moderator_bits() {
        // migrations seed moderator with 1 + 4 + 8 + 64
        let moderator = Permissions::from_bits(77).unwrap_or_default();
        assert!(moderator.contains(Permissions::APPROVE_USERS | Permissions::MODERATE_COMMENTS));
        assert!(!moderator.contains(Permissions::MANAGE_ROLES));
    }
}
