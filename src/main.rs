//! CommunityHub server
//!
//! Main application entry point

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use CommunityHub::{
    config::Settings,
    create_router,
    database::{create_pool, run_migrations, DatabaseService},
    utils::logging,
    AppState,
};

const RATE_LIMIT_SWEEP: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Held until shutdown so buffered log lines are flushed
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", CommunityHub::info());

    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;

    run_migrations(&pool).await?;

    let database = DatabaseService::new(pool);
    let state = AppState::new(settings.clone(), database);

    match state.services.auth_service.ensure_bootstrap_admin().await {
        Ok(Some(admin)) => info!(user_id = admin.id, email = %admin.email, "Bootstrap admin created"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to create bootstrap admin"),
    }

    // Periodically forget idle rate limit entries
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP);
        loop {
            interval.tick().await;
            limiter.cleanup_old_entries();
        }
    });

    let app = create_router(state);

    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("CommunityHub has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
