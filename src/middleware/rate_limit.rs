//! Rate limiting middleware
//!
//! Sliding-window limiter with a burst allowance, keyed by client address.
//! Applied to the unauthenticated auth endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use crate::config::RateLimitSettings;
use crate::state::AppState;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::logging::log_security_event;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Extra requests allowed in short bursts
    pub burst_allowance: u32,
    /// Key on `X-Forwarded-For` instead of the peer address
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            burst_allowance: 5,
            trust_forwarded_for: false,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_seconds),
            burst_allowance: settings.burst_allowance,
            trust_forwarded_for: settings.trust_forwarded_for,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<Instant>,
    burst_used: u32,
    last_reset: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            requests: Vec::new(),
            burst_used: 0,
            last_reset: Instant::now(),
        }
    }

    /// Drop requests outside the window
    fn cleanup(&mut self, window_duration: Duration) {
        let now = Instant::now();
        self.requests
            .retain(|&time| now.saturating_duration_since(time) < window_duration);

        if self.last_reset.elapsed() > window_duration {
            self.burst_used = 0;
            self.last_reset = now;
        }
    }

    fn is_allowed(&mut self, config: &RateLimitConfig) -> bool {
        self.cleanup(config.window_duration);

        if (self.requests.len() as u32) < config.max_requests {
            return true;
        }
        if self.burst_used < config.burst_allowance {
            self.burst_used += 1;
            return true;
        }
        false
    }
}

/// In-memory limiter shared by all request handlers
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // A poisoned lock only means another request panicked mid-update; the
    // counters are still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a request from `key`, failing once the window is exhausted
    pub fn check(&self, key: &str) -> Result<()> {
        let mut entries = self.entries();
        let entry = entries.entry(key.to_string()).or_insert_with(RateLimitEntry::new);

        if entry.is_allowed(&self.config) {
            entry.requests.push(Instant::now());
            debug!(client = key, "Rate limit check passed");
            Ok(())
        } else {
            warn!(client = key, "Rate limit exceeded");
            Err(CommunityError::RateLimitExceeded)
        }
    }

    /// Requests left in the current window for `key`
    pub fn remaining(&self, key: &str) -> u32 {
        let entries = self.entries();
        match entries.get(key) {
            Some(entry) => {
                let mut entry = entry.clone();
                entry.cleanup(self.config.window_duration);
                self.config.max_requests.saturating_sub(entry.requests.len() as u32)
            }
            None => self.config.max_requests,
        }
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.config.trust_forwarded_for
    }

    /// Forget clients with no recent requests
    pub fn cleanup_old_entries(&self) -> usize {
        let mut entries = self.entries();
        let window = self.config.window_duration * 2;
        let now = Instant::now();

        entries.retain(|_, entry| {
            entry
                .requests
                .iter()
                .any(|&time| now.saturating_duration_since(time) < window)
        });

        debug!(remaining_entries = entries.len(), "Cleaned up old rate limit entries");
        entries.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Peer address, or the first `X-Forwarded-For` hop when running behind a
/// trusted proxy. Clients can set that header freely, so it is ignored
/// unless `trust_forwarded_for` is on.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response> {
    let key = client_key(&request, state.rate_limiter.trusts_forwarded_for());
    if let Err(err) = state.rate_limiter.check(&key) {
        log_security_event("rate_limited", None, &format!("{} {}", key, request.uri().path()));
        return Err(err);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn limiter(max_requests: u32, burst_allowance: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_duration: Duration::from_secs(60),
            burst_allowance,
            trust_forwarded_for: false,
        })
    }

    #[test]
    fn test_rate_limit_basic() {
        let limiter = limiter(3, 1);

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());

        // burst allowance
        assert!(limiter.check("10.0.0.1").is_ok());

        assert!(matches!(
            limiter.check("10.0.0.1"),
            Err(CommunityError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 0);

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());
        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn test_remaining() {
        let limiter = limiter(5, 2);
        assert_eq!(limiter.remaining("10.0.0.1"), 5);

        limiter.check("10.0.0.1").unwrap();
        limiter.check("10.0.0.1").unwrap();
        assert_eq!(limiter.remaining("10.0.0.1"), 3);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::default();
        limiter.check("10.0.0.1").unwrap();

        assert_eq!(limiter.cleanup_old_entries(), 1);
    }

    #[test]
    fn test_client_key() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, true), "203.0.113.7");

        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request, true), "unknown");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4000))));
        assert_eq!(client_key(&request, true), "192.168.1.20");
    }

    #[test]
    fn test_client_key_ignores_forwarded_for_by_default() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4000))));

        assert_eq!(client_key(&request, false), "192.168.1.20");
        assert_eq!(client_key(&request, true), "203.0.113.7");
    }

    #[test]
    fn test_from_settings_defaults_to_untrusted_forwarding() {
        let config = RateLimitConfig::from(&crate::config::Settings::default().rate_limit);
        assert!(!config.trust_forwarded_for);
    }
}
