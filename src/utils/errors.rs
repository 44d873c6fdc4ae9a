//! Error handling for CommunityHub
//!
//! This module defines the main error type used throughout the application,
//! its mapping onto HTTP responses, and the unified error handling strategy.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Main error type for CommunityHub application
#[derive(Error, Debug)]
pub enum CommunityError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Family member not found: {member_id}")]
    FamilyMemberNotFound { member_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Poll not found: {poll_id}")]
    PollNotFound { poll_id: i64 },

    #[error("Comment not found: {comment_id}")]
    CommentNotFound { comment_id: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid email/mobile or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("No route for {0}")]
    RouteNotFound(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for CommunityHub operations
pub type Result<T> = std::result::Result<T, CommunityError>;

impl CommunityError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CommunityError::Database(_) => ErrorSeverity::Critical,
            CommunityError::Migration(_) => ErrorSeverity::Critical,
            CommunityError::Config(_) => ErrorSeverity::Critical,
            CommunityError::PermissionDenied(_) => ErrorSeverity::Warning,
            CommunityError::Authentication(_) => ErrorSeverity::Warning,
            CommunityError::InvalidCredentials => ErrorSeverity::Warning,
            CommunityError::RateLimitExceeded => ErrorSeverity::Warning,
            CommunityError::InvalidInput(_) => ErrorSeverity::Info,
            CommunityError::Conflict(_) => ErrorSeverity::Info,
            CommunityError::TokenExpired => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status code and stable machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            CommunityError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            CommunityError::Authentication(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            CommunityError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            CommunityError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            CommunityError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "forbidden"),
            CommunityError::UserNotFound { .. }
            | CommunityError::FamilyMemberNotFound { .. }
            | CommunityError::EventNotFound { .. }
            | CommunityError::PollNotFound { .. }
            | CommunityError::CommentNotFound { .. }
            | CommunityError::NotFound { .. }
            | CommunityError::RouteNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CommunityError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            CommunityError::InvalidStateTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state_transition")
            }
            CommunityError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            CommunityError::Timeout => (StatusCode::REQUEST_TIMEOUT, "timeout"),
            CommunityError::Database(_)
            | CommunityError::Migration(_)
            | CommunityError::Config(_)
            | CommunityError::Serialization(_)
            | CommunityError::Io(_)
            | CommunityError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Map a database error, turning unique violations into conflicts
    pub fn from_db(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return CommunityError::Conflict(conflict_message.to_string());
            }
        }
        CommunityError::Database(err)
    }
}

impl From<JsonRejection> for CommunityError {
    fn from(rejection: JsonRejection) -> Self {
        CommunityError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for CommunityError {
    fn from(rejection: PathRejection) -> Self {
        CommunityError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for CommunityError {
    fn from(rejection: QueryRejection) -> Self {
        CommunityError::InvalidInput(rejection.body_text())
    }
}

/// JSON body returned for failed requests
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for CommunityError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            error!(error = %self, severity = %self.severity(), "Request failed with internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorBody {
            success: false,
            error: code,
            message,
        });

        (status, body).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CommunityError::InvalidInput("x".into()).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CommunityError::UserNotFound { user_id: 1 }.status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CommunityError::Conflict("dup".into()).status_and_code().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            CommunityError::RateLimitExceeded.status_and_code().0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            CommunityError::RouteNotFound("/x".into()).status_and_code(),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            CommunityError::Timeout.status_and_code(),
            (StatusCode::REQUEST_TIMEOUT, "timeout")
        );
        assert_eq!(
            CommunityError::Internal("boom".into()).status_and_code().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(CommunityError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(CommunityError::InvalidCredentials.severity(), ErrorSeverity::Warning);
        assert_eq!(CommunityError::InvalidInput("x".into()).severity(), ErrorSeverity::Info);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = CommunityError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_row_not_found_is_not_conflict() {
        let err = CommunityError::from_db(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, CommunityError::Database(_)));
    }
}
