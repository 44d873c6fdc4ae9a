//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod admin;
pub mod approval;
pub mod comment;
pub mod event;
pub mod family;
pub mod pagination;
pub mod permission;
pub mod poll;
pub mod transfer;
pub mod user;

// Re-export commonly used models
pub use admin::{ActivityLog, ActivityLogFilter, DashboardStats, EnumValue, NewActivityLog, Role, RoleView};
pub use approval::{ApprovalAction, ApprovalStats, ApprovalStatus, RejectRequest, Transition};
pub use comment::{Comment, CommentView, LikeState, ModerationAction};
pub use event::{Event, EventCategory, EventDetail, EventRsvp, RsvpResponse, RsvpTally};
pub use family::{FamilyMember, FamilyView, NewFamilyMember};
pub use pagination::{Page, PageParams, PageRequest};
pub use permission::Permissions;
pub use poll::{Poll, PollDetail, PollOption};
pub use transfer::{PrimaryAccountTransfer, TransferPlan, TransferRequest};
pub use user::{NewUser, User};
