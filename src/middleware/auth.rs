//! Authentication middleware
//!
//! Resolves the bearer token into an [`AuthContext`] for protected routes.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::services::auth::AuthContext;
use crate::state::AppState;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::logging::log_security_event;

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve(headers: &HeaderMap, path: &str, state: &AppState) -> Result<AuthContext> {
    let Some(token) = bearer_token(headers) else {
        log_security_event("auth_missing", None, path);
        return Err(CommunityError::Authentication(
            "Missing bearer token".to_string(),
        ));
    };

    match state.services.auth_service.authenticate(token).await {
        Ok(ctx) => Ok(ctx),
        Err(err) => {
            log_security_event("auth_failed", None, &format!("{}: {}", path, err));
            Err(err)
        }
    }
}

/// Reject unauthenticated requests and stash the caller in the extensions
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response> {
    let ctx = resolve(request.headers(), request.uri().path(), &state).await?;
    debug!(user_id = ctx.user_id(), path = %request.uri().path(), "Request authenticated");

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = CommunityError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(ctx.clone());
        }

        let ctx = resolve(&parts.headers, parts.uri.path(), state).await?;
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
