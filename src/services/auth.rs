//! Authentication service implementation
//!
//! This service handles registration, password login, JWT issuance and
//! verification, and permission checks against the caller's role.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::settings::{AuthConfig, BootstrapAdminConfig, FeaturesConfig};
use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog, MEMBER_ROLE, SUPER_ADMIN_ROLE};
use crate::models::approval::ApprovalStatus;
use crate::models::permission::Permissions;
use crate::models::user::{ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, RegisterRequest, User};
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{
    clean_optional, generate_sub_family_number, is_email_identifier, is_valid_email, normalize_email,
    normalize_mobile, validate_name, validate_password,
};
use crate::utils::logging::log_security_event;

/// JWT claims issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub role: String,
    pub permissions: i64,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| CommunityError::Authentication("Malformed token subject".to_string()))
    }
}

/// Authenticated caller, loaded fresh from the database on every request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub permissions: Permissions,
}

impl AuthContext {
    pub fn new(user: User) -> Self {
        let permissions = user.permissions();
        Self { user, permissions }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn has(&self, permission: Permissions) -> bool {
        self.permissions.contains(permission)
    }

    /// Require specific permission or return error
    pub fn require(&self, permission: Permissions) -> Result<()> {
        if self.has(permission) {
            return Ok(());
        }
        Err(CommunityError::PermissionDenied(format!(
            "Missing permission: {}",
            permission
        )))
    }

    pub fn is_super_admin(&self) -> bool {
        self.user.role_name == SUPER_ADMIN_ROLE
    }

    /// Own record, or a holder of `permission`
    pub fn require_self_or(&self, user_id: i64, permission: Permissions) -> Result<()> {
        if self.user.id == user_id {
            return Ok(());
        }
        self.require(permission)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CommunityError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseService,
    config: AuthConfig,
    features: FeaturesConfig,
}

impl AuthService {
    pub fn new(db: DatabaseService, config: AuthConfig, features: FeaturesConfig) -> Self {
        Self { db, config, features }
    }

    /// Sign a token for `user`
    pub fn issue_token(&self, user: &User) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.config.token_ttl_minutes);
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role_name.clone(),
            permissions: user.role_permissions,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| CommunityError::Internal(format!("Token signing failed: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Verify signature and expiry
    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => CommunityError::TokenExpired,
            _ => {
                debug!("JWT validation failed: {e}");
                CommunityError::Authentication("Invalid token".to_string())
            }
        })?;

        Ok(data.claims)
    }

    /// Resolve a bearer token into the caller's current account state
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.decode_token(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .db
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| CommunityError::Authentication("Account no longer exists".to_string()))?;

        ensure_can_sign_in(&user)?;
        Ok(AuthContext::new(user))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        if !self.features.self_registration {
            return Err(CommunityError::PermissionDenied(
                "Self registration is disabled".to_string(),
            ));
        }

        let new_user = self.prepare_new_user(request).await?;
        let user = self.db.users.create(new_user).await?;

        info!(user_id = user.id, name = %user.full_name(), sub_family = %user.sub_family_number, "User registered");
        self.db
            .log_activity(NewActivityLog::new(Some(user.id), actions::USER_REGISTERED, "user", Some(user.id)))
            .await;

        Ok(user)
    }

    async fn prepare_new_user(&self, request: RegisterRequest) -> Result<NewUser> {
        let first_name = validate_name("first_name", &request.first_name).map_err(CommunityError::InvalidInput)?;
        let last_name = validate_name("last_name", &request.last_name).map_err(CommunityError::InvalidInput)?;

        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(CommunityError::InvalidInput("Invalid email address".to_string()));
        }
        let mobile = normalize_mobile(&request.mobile)
            .ok_or_else(|| CommunityError::InvalidInput("Invalid mobile number".to_string()))?;
        validate_password(&request.password).map_err(CommunityError::InvalidInput)?;

        if self.db.users.email_taken(&email, None).await? {
            return Err(CommunityError::Conflict("Email is already registered".to_string()));
        }
        if self.db.users.mobile_taken(&mobile, None).await? {
            return Err(CommunityError::Conflict("Mobile number is already registered".to_string()));
        }

        let member_role = self
            .db
            .roles
            .find_by_name(MEMBER_ROLE)
            .await?
            .ok_or_else(|| CommunityError::Internal("Member role is missing".to_string()))?;

        // Joining an existing sub-family never creates a second primary
        let (sub_family_number, is_primary_account) = match clean_optional(request.sub_family_number) {
            Some(number) => {
                let primary = self.db.users.find_primary(&number).await?;
                if !primary.is_some_and(|primary| primary.is_active) {
                    return Err(CommunityError::InvalidInput(format!("Unknown sub-family {}", number)));
                }
                (number, false)
            }
            None => (generate_sub_family_number(), true),
        };

        Ok(NewUser {
            first_name,
            last_name,
            email,
            mobile,
            password_hash: hash_password(&request.password)?,
            role_id: member_role.id,
            approval_status: ApprovalStatus::Pending,
            sub_family_number,
            is_primary_account,
            gender: clean_optional(request.gender),
            date_of_birth: request.date_of_birth,
            address: clean_optional(request.address),
            city: clean_optional(request.city),
            occupation: clean_optional(request.occupation),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let identifier = request.identifier.trim();
        let user = if is_email_identifier(identifier) {
            self.db.users.find_by_email(&normalize_email(identifier)).await?
        } else {
            match normalize_mobile(identifier) {
                Some(mobile) => self.db.users.find_by_mobile(&mobile).await?,
                None => None,
            }
        };

        // Unknown identifiers and wrong passwords are indistinguishable
        let user = match user {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            Some(user) => {
                log_security_event("login_failed", Some(user.id), "wrong password");
                return Err(CommunityError::InvalidCredentials);
            }
            None => {
                log_security_event("login_failed", None, "unknown identifier");
                return Err(CommunityError::InvalidCredentials);
            }
        };

        ensure_can_sign_in(&user)?;

        self.db.users.record_login(user.id).await?;
        let (token, expires_at) = self.issue_token(&user)?;
        let permissions = user.permissions().names();

        info!(user_id = user.id, "User logged in");
        self.db
            .log_activity(NewActivityLog::new(Some(user.id), actions::USER_LOGGED_IN, "user", Some(user.id)))
            .await;

        Ok(LoginResponse {
            token,
            expires_at,
            user,
            permissions,
        })
    }

    pub async fn change_password(&self, ctx: &AuthContext, request: ChangePasswordRequest) -> Result<()> {
        if !verify_password(&request.current_password, &ctx.user.password_hash) {
            log_security_event("password_change_failed", Some(ctx.user_id()), "wrong current password");
            return Err(CommunityError::InvalidCredentials);
        }
        validate_password(&request.new_password).map_err(CommunityError::InvalidInput)?;
        if request.new_password == request.current_password {
            return Err(CommunityError::InvalidInput(
                "New password must differ from the current one".to_string(),
            ));
        }

        let hash = hash_password(&request.new_password)?;
        self.db.users.update_password(ctx.user_id(), &hash).await?;

        self.db
            .log_activity(NewActivityLog::new(
                Some(ctx.user_id()),
                actions::USER_PASSWORD_CHANGED,
                "user",
                Some(ctx.user_id()),
            ))
            .await;

        Ok(())
    }

    /// Seed an approved super admin when none can sign in yet
    pub async fn ensure_bootstrap_admin(&self) -> Result<Option<User>> {
        let Some(admin) = self.config.bootstrap_admin.clone() else {
            return Ok(None);
        };

        let super_admin = self
            .db
            .roles
            .find_by_name(SUPER_ADMIN_ROLE)
            .await?
            .ok_or_else(|| CommunityError::Internal("Super admin role is missing".to_string()))?;
        if self.db.users.count_with_role(super_admin.id).await? > 0 {
            return Ok(None);
        }

        let BootstrapAdminConfig {
            first_name,
            last_name,
            email,
            mobile,
            password,
        } = admin;

        let mut new_user = self
            .prepare_new_user(RegisterRequest {
                first_name,
                last_name,
                email,
                mobile,
                password,
                gender: None,
                date_of_birth: None,
                address: None,
                city: None,
                occupation: None,
                sub_family_number: None,
            })
            .await?;
        new_user.role_id = super_admin.id;
        new_user.approval_status = ApprovalStatus::Approved;

        let user = self.db.users.create(new_user).await?;
        warn!(user_id = user.id, email = %user.email, "Bootstrap super admin created");
        Ok(Some(user))
    }
}

/// Approval and activation gate shared by login and token checks
pub fn ensure_can_sign_in(user: &User) -> Result<()> {
    if !user.is_active {
        return Err(CommunityError::PermissionDenied("account deactivated".to_string()));
    }
    match user.approval_status {
        ApprovalStatus::Approved => Ok(()),
        ApprovalStatus::Pending => Err(CommunityError::PermissionDenied(
            "account awaiting approval".to_string(),
        )),
        ApprovalStatus::Rejected => Err(CommunityError::PermissionDenied("account rejected".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(status: ApprovalStatus, active: bool) -> User {
        User {
            id: 42,
            first_name: "Asha".to_string(),
            last_name: "Patel".to_string(),
            email: "asha@example.org".to_string(),
            mobile: "+919876543210".to_string(),
            password_hash: String::new(),
            role_id: 3,
            role_name: "moderator".to_string(),
            role_permissions: (Permissions::VIEW_MEMBERS | Permissions::MODERATE_COMMENTS).bits(),
            approval_status: status,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            sub_family_number: "SF-20240101-ABCDEF".to_string(),
            is_primary_account: true,
            gender: None,
            date_of_birth: None,
            address: None,
            city: None,
            occupation: None,
            is_active: active,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_sign_in_gate() {
        assert!(ensure_can_sign_in(&user(ApprovalStatus::Approved, true)).is_ok());
        assert_matches!(
            ensure_can_sign_in(&user(ApprovalStatus::Pending, true)),
            Err(CommunityError::PermissionDenied(msg)) if msg == "account awaiting approval"
        );
        assert_matches!(
            ensure_can_sign_in(&user(ApprovalStatus::Rejected, true)),
            Err(CommunityError::PermissionDenied(msg)) if msg == "account rejected"
        );
        assert_matches!(
            ensure_can_sign_in(&user(ApprovalStatus::Approved, false)),
            Err(CommunityError::PermissionDenied(msg)) if msg == "account deactivated"
        );
    }

    #[test]
    fn test_context_permissions() {
        let ctx = AuthContext::new(user(ApprovalStatus::Approved, true));
        assert!(ctx.has(Permissions::MODERATE_COMMENTS));
        assert!(ctx.require(Permissions::MANAGE_ROLES).is_err());
        assert!(ctx.require_self_or(42, Permissions::MANAGE_USERS).is_ok());
        assert!(ctx.require_self_or(7, Permissions::MANAGE_USERS).is_err());
        assert!(!ctx.is_super_admin());
    }
}
