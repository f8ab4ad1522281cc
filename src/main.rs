//! Attendance Guard Server
//!
//! HTTP front for the attendance workflow: spoof screening and geofence
//! containment on every check-in.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attendance_guard::{
    config::HistoryFailurePolicy, create_router, db, store::PgStore, AppState, AttendanceService,
    Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "attendance_guard=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Attendance Guard starting ({})...", config.environment);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));
    tracing::info!(
        "Spoof policy: {:.0} km/h, accuracy [{}, {}] m, window {} ms / {} samples, clock skew {} ms, history failure: {:?}",
        config.spoof.speed_threshold_kmh,
        config.spoof.accuracy_min_meters,
        config.spoof.accuracy_max_meters,
        config.spoof.time_window_ms,
        config.spoof.teleport_sample_limit,
        config.spoof.max_clock_skew_ms,
        config.history_failure_policy,
    );
    if config.is_production() && config.history_failure_policy == HistoryFailurePolicy::FailOpen {
        tracing::warn!("Running fail-open in production: history outages skip speed/teleport checks");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Build application state
    let store = Arc::new(PgStore::new(pool));
    let state = AppState {
        service: Arc::new(AttendanceService::new(store, &config)),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
