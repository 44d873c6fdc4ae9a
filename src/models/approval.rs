//! Approval workflow shared by users and family members

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// Outcome of applying an [`ApprovalAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The record moves to the contained status
    Changed(ApprovalStatus),
    /// The record already has the target status
    Unchanged,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Apply an approval action. Repeating the current state is a no-op.
    pub fn apply(self, action: ApprovalAction) -> Transition {
        let target = match action {
            ApprovalAction::Approve => ApprovalStatus::Approved,
            ApprovalAction::Reject => ApprovalStatus::Rejected,
        };

        if self == target {
            Transition::Unchanged
        } else {
            Transition::Changed(target)
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }
}

/// Body of `POST .../reject`
#[derive(Debug, Clone, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// Counts per approval status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

impl ApprovalStats {
    /// Build from `(status, count)` rows
    pub fn from_counts(rows: &[(ApprovalStatus, i64)]) -> Self {
        let mut stats = ApprovalStats::default();
        for (status, count) in rows {
            match status {
                ApprovalStatus::Pending => stats.pending += count,
                ApprovalStatus::Approved => stats.approved += count,
                ApprovalStatus::Rejected => stats.rejected += count,
            }
            stats.total += count;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_transitions() {
        assert_eq!(
            ApprovalStatus::Pending.apply(ApprovalAction::Approve),
            Transition::Changed(ApprovalStatus::Approved)
        );
        assert_eq!(
            ApprovalStatus::Rejected.apply(ApprovalAction::Approve),
            Transition::Changed(ApprovalStatus::Approved)
        );
        assert_eq!(
            ApprovalStatus::Approved.apply(ApprovalAction::Approve),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_reject_transitions() {
        assert_eq!(
            ApprovalStatus::Pending.apply(ApprovalAction::Reject),
            Transition::Changed(ApprovalStatus::Rejected)
        );
        assert_eq!(
            ApprovalStatus::Approved.apply(ApprovalAction::Reject),
            Transition::Changed(ApprovalStatus::Rejected)
        );
        assert_eq!(
            ApprovalStatus::Rejected.apply(ApprovalAction::Reject),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        for status in [ApprovalStatus::Pending, ApprovalStatus::Approved, ApprovalStatus::Rejected] {
            for action in [ApprovalAction::Approve, ApprovalAction::Reject] {
                let once = match status.apply(action) {
                    Transition::Changed(next) => next,
                    Transition::Unchanged => status,
                };
                assert_eq!(once.apply(action), Transition::Unchanged);
            }
        }
    }

    #[test]
    fn test_stats_reconcile() {
        let stats = ApprovalStats::from_counts(&[
            (ApprovalStatus::Pending, 3),
            (ApprovalStatus::Approved, 10),
            (ApprovalStatus::Rejected, 2),
        ]);
        assert_eq!(stats.total, stats.pending + stats.approved + stats.rejected);
        assert_eq!(stats.total, 15);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ApprovalStatus::Approved).unwrap_or_default();
        assert_eq!(json, "\"approved\"");
        assert_eq!(ApprovalStatus::Rejected.to_string(), "rejected");
    }
}
