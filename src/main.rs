//! Sevapay - Main Application Entry Point
//!
//! REST API server for the wallet ledger of a government-services retailer
//! platform: scheme applications, admin review with commission payouts and
//! refunds, and gateway-driven wallet recharges.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Provision the bootstrap admin if configured
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use sevapay::{AppState, app, config::Config, db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Make sure a fresh database has a reachable admin
    if let Some(key) = config.bootstrap_admin_key.as_deref() {
        db::ensure_bootstrap_admin(&pool, key).await?;
    }

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState { pool, config };

    // Bind to network address and start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app(state)).await?;

    Ok(())
}
