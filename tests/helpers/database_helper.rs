//! Test database helper utilities
//!
//! Database-backed tests run against `TEST_DATABASE_URL` and are skipped
//! when it is unset.

use sqlx::PgPool;
use std::sync::Once;

use CommunityHub::database::{create_pool, run_migrations};
use CommunityHub::Settings;

static INIT: Once = Once::new();

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-length";

/// Settings suitable for tests; nothing is read from disk or the environment
pub fn test_settings(database_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.database.url = database_url.to_string();
    settings.database.max_connections = 5;
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    settings.auth.token_ttl_minutes = 60;
    settings.server.request_timeout_seconds = 10;
    settings
}

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Test database handle that manages schema and cleanup
pub struct TestDatabase {
    pub pool: PgPool,
    pub database_url: String,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when no test database is configured
    pub async fn from_env() -> Option<Self> {
        init_test_logging();

        let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let settings = test_settings(&database_url);

        let pool = create_pool(&settings.database)
            .await
            .expect("Failed to connect to TEST_DATABASE_URL");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = Self { pool, database_url };
        db.cleanup().await.expect("Failed to clean test database");
        Some(db)
    }

    /// Remove everything except seeded roles and enum values
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            TRUNCATE comment_flags, comment_likes, comments, poll_votes, poll_options, polls,
                     event_rsvps, events, primary_account_transfers, family_members,
                     activity_logs, users
            RESTART IDENTITY CASCADE
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM roles WHERE NOT is_system")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"
            DELETE FROM enum_values
            WHERE enum_type <> 'relationship'
               OR value NOT IN ('spouse', 'son', 'daughter', 'father', 'mother', 'brother',
                                'sister', 'daughter_in_law', 'grandchild', 'other')
            "#,
        )
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_records(&self, table: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
