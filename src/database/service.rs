//! Database service layer
//!
//! This module provides a high-level interface to database operations

use chrono::{DateTime, Utc};

use crate::database::{
    ActivityLogRepository, CommentRepository, DatabasePool, EnumValueRepository, EventRepository,
    FamilyMemberRepository, PollRepository, RoleRepository, TransferRepository, UserRepository,
};
use crate::models::*;
use crate::utils::errors::CommunityError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub roles: RoleRepository,
    pub family_members: FamilyMemberRepository,
    pub transfers: TransferRepository,
    pub events: EventRepository,
    pub polls: PollRepository,
    pub comments: CommentRepository,
    pub activity_logs: ActivityLogRepository,
    pub enum_values: EnumValueRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            roles: RoleRepository::new(pool.clone()),
            family_members: FamilyMemberRepository::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            polls: PollRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            activity_logs: ActivityLogRepository::new(pool.clone()),
            enum_values: EnumValueRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Append an activity log entry. Failures are logged and swallowed so
    /// that an audit write never undoes a completed action.
    pub async fn log_activity(&self, entry: NewActivityLog) {
        if let Err(e) = self.activity_logs.insert(&entry).await {
            tracing::error!(
                error = %e,
                action = %entry.action,
                entity_type = %entry.entity_type,
                "Failed to write activity log"
            );
        }
    }

    /// A sub-family's primary account and dependents
    pub async fn family_view(&self, sub_family_number: &str) -> Result<FamilyView, CommunityError> {
        let primary = self.users.find_primary(sub_family_number).await?;
        let members = self.family_members.list_by_sub_family(sub_family_number).await?;

        Ok(FamilyView {
            sub_family_number: sub_family_number.to_string(),
            primary,
            members,
        })
    }

    /// Get system statistics
    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, CommunityError> {
        let users = ApprovalStats::from_counts(&self.users.count_by_status().await?);
        let family_members = ApprovalStats::from_counts(&self.family_members.count_by_status().await?);
        let upcoming_events = self.events.count_upcoming(now).await?;
        let open_polls = self.polls.count_open(now).await?;
        let flagged_comments = self.comments.count_flagged().await?;

        Ok(DashboardStats {
            users,
            family_members,
            upcoming_events,
            open_polls,
            flagged_comments,
        })
    }
}
