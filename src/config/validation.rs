//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers;

/// Minimum accepted length of the JWT signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_pagination_config(&settings.pagination)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(CommunityError::Config("Server host is required".to_string()));
    }

    if config.port == 0 {
        return Err(CommunityError::Config("Server port must be greater than 0".to_string()));
    }

    if config.request_timeout_seconds == 0 {
        return Err(CommunityError::Config(
            "Request timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CommunityError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(CommunityError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CommunityError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate authentication configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(CommunityError::Config(format!(
            "JWT secret must be at least {} characters long",
            MIN_JWT_SECRET_LEN
        )));
    }

    if config.token_ttl_minutes <= 0 {
        return Err(CommunityError::Config(
            "Token TTL must be greater than 0".to_string(),
        ));
    }

    if config.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
        return Err(CommunityError::Config(format!(
            "Token TTL must not exceed {} minutes",
            MAX_TOKEN_TTL_MINUTES
        )));
    }

    if let Some(ref admin) = config.bootstrap_admin {
        if !helpers::is_valid_email(&admin.email) {
            return Err(CommunityError::Config(
                "Bootstrap admin email is invalid".to_string(),
            ));
        }
        if helpers::normalize_mobile(&admin.mobile).is_none() {
            return Err(CommunityError::Config(
                "Bootstrap admin mobile is invalid".to_string(),
            ));
        }
        if admin.password.len() < helpers::MIN_PASSWORD_LEN {
            return Err(CommunityError::Config(format!(
                "Bootstrap admin password must be at least {} characters",
                helpers::MIN_PASSWORD_LEN
            )));
        }
    }

    Ok(())
}

/// Validate pagination configuration
fn validate_pagination_config(config: &super::PaginationConfig) -> Result<()> {
    if config.default_per_page == 0 || config.max_per_page == 0 {
        return Err(CommunityError::Config(
            "Page sizes must be greater than 0".to_string(),
        ));
    }

    if config.default_per_page > config.max_per_page {
        return Err(CommunityError::Config(
            "Default page size cannot exceed max page size".to_string(),
        ));
    }

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitSettings) -> Result<()> {
    if config.max_requests == 0 || config.window_seconds == 0 {
        return Err(CommunityError::Config(
            "Rate limit requests and window must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CommunityError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CommunityError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapAdminConfig;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "x".repeat(MIN_JWT_SECRET_LEN);
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let settings = Settings::default();
        assert!(matches!(
            validate_settings(&settings),
            Err(CommunityError::Config(_))
        ));
    }

    #[test]
    fn test_token_ttl_bounds() {
        let mut settings = valid_settings();
        settings.auth.token_ttl_minutes = MAX_TOKEN_TTL_MINUTES;
        assert!(validate_settings(&settings).is_ok());

        settings.auth.token_ttl_minutes = MAX_TOKEN_TTL_MINUTES + 1;
        assert!(matches!(
            validate_settings(&settings),
            Err(CommunityError::Config(_))
        ));

        settings.auth.token_ttl_minutes = i64::MAX;
        assert!(validate_settings(&settings).is_err());

        settings.auth.token_ttl_minutes = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_min_connections_above_max_rejected() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_default_page_size_above_max_rejected() {
        let mut settings = valid_settings();
        settings.pagination.default_per_page = 500;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_bootstrap_admin_validated() {
        let mut settings = valid_settings();
        settings.auth.bootstrap_admin = Some(BootstrapAdminConfig {
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            email: "not-an-email".to_string(),
            mobile: "+15551234567".to_string(),
            password: "long-enough-password".to_string(),
        });
        assert!(validate_settings(&settings).is_err());

        if let Some(admin) = settings.auth.bootstrap_admin.as_mut() {
            admin.email = "root@example.org".to_string();
        }
        assert!(validate_settings(&settings).is_ok());
    }
}
