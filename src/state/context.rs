//! Application context handed to every request handler

use std::sync::Arc;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::models::pagination::{PageParams, PageRequest};
use crate::services::ServiceFactory;

/// Application-wide state containing services and settings
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub database: DatabaseService,
    pub services: Arc<ServiceFactory>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(settings: Settings, database: DatabaseService) -> Self {
        let services = ServiceFactory::new(database.clone(), &settings);
        let rate_limiter = RateLimiter::new(RateLimitConfig::from(&settings.rate_limit));

        Self {
            settings: Arc::new(settings),
            database,
            services: Arc::new(services),
            rate_limiter,
        }
    }

    /// Resolve `?page=&per_page=` against the configured defaults
    pub fn page(&self, request: &PageRequest) -> PageParams {
        request.resolve(&self.settings.pagination)
    }
}
