//! Settlement Worker
//!
//! Entry point for the settlement backend worker. It runs database
//! migrations and the periodic ledger reconciliation sweep; the request/
//! response API layer lives in a separate service and consumes this crate as
//! a library.

use anyhow::Context;
use settlement_backend::config::AppConfig;
use settlement_backend::database::{create_pool, run_migrations};
use settlement_backend::services::{AuditTrailService, ReconciliationService};
use settlement_backend::AppState;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Configuration error")?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("settlement_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("Settlement worker starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Reconcile interval: {}s", config.reconcile_interval_secs);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, None)
        .await
        .context("Database migration failed")?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // SERVICES
    // =========================================================================
    let app_state = Arc::new(AppState::new(pool.clone()));
    info!("Application state initialized with repositories");

    let audit = Arc::new(
        AuditTrailService::new(config.audit_log_dir.clone())
            .context("Failed to initialize audit trail")?,
    );
    info!("Audit trail service initialized");

    let reconciliation = ReconciliationService::new(pool, app_state.wallet_repo.clone())
        .with_interval(config.reconcile_interval())
        .with_audit(audit);

    let reconciliation_handle = tokio::spawn(async move {
        reconciliation.start().await;
    });
    info!("Reconciliation background task started");

    info!("Settlement worker ready, press Ctrl+C to shutdown");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = reconciliation_handle => {
            error!("Reconciliation task exited unexpectedly");
        }
    }

    info!("Settlement worker shutdown complete");
    Ok(())
}
