//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod activity_log;
pub mod comment;
pub mod enum_value;
pub mod event;
pub mod family_member;
pub mod poll;
pub mod role;
pub mod transfer;
pub mod user;

// Re-export repositories
pub use activity_log::ActivityLogRepository;
pub use comment::CommentRepository;
pub use enum_value::EnumValueRepository;
pub use event::EventRepository;
pub use family_member::FamilyMemberRepository;
pub use poll::PollRepository;
pub use role::RoleRepository;
pub use transfer::TransferRepository;
pub use user::UserRepository;
