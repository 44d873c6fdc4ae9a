//! Services module
//!
//! This module contains business logic services

pub mod admin;
pub mod auth;
pub mod comment;
pub mod event;
pub mod family;
pub mod poll;
pub mod transfer;
pub mod user;

// Re-export commonly used services
pub use admin::AdminService;
pub use auth::{AuthContext, AuthService, Claims};
pub use comment::CommentService;
pub use event::EventService;
pub use family::FamilyService;
pub use poll::PollService;
pub use transfer::TransferService;
pub use user::UserService;

use crate::config::settings::Settings;
use crate::database::DatabaseService;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub family_service: FamilyService,
    pub transfer_service: TransferService,
    pub event_service: EventService,
    pub poll_service: PollService,
    pub comment_service: CommentService,
    pub admin_service: AdminService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(db: DatabaseService, settings: &Settings) -> Self {
        Self {
            auth_service: AuthService::new(db.clone(), settings.auth.clone(), settings.features.clone()),
            user_service: UserService::new(db.clone()),
            family_service: FamilyService::new(db.clone()),
            transfer_service: TransferService::new(db.clone()),
            event_service: EventService::new(db.clone(), settings.features.clone()),
            poll_service: PollService::new(db.clone()),
            comment_service: CommentService::new(db.clone()),
            admin_service: AdminService::new(db),
        }
    }
}
