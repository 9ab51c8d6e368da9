//! IndexHub Server — content indexing job queue and worker
//!
//! Main entry point that wires the stores, the worker service and the cron
//! triggers together and runs until a shutdown signal arrives.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use indexhub_core::config::{AppConfig, LogFormat};
use indexhub_core::error::AppError;
use indexhub_worker::{CronScheduler, WorkerDeps, WorkerService};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/default`, the environment overlay and
/// `INDEXHUB__*` variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("INDEXHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting IndexHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = indexhub_database::DatabasePool::connect(&config.database)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    tracing::info!("Running database migrations...");
    indexhub_database::migration::run_migrations(db.pool())
        .await
        .map_err(|e| AppError::internal(format!("Migration failed: {}", e)))?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Worker service ───────────────────────────────────
    let deps = WorkerDeps::postgres(&config, &db)?;
    let service = Arc::new(WorkerService::new(config, deps)?);
    tracing::info!(
        runner_id = service.runner().runner_id(),
        provider = %service.config().indexer.provider,
        "Worker service initialized"
    );

    // ── Step 3: Cron triggers ────────────────────────────────────
    let mut scheduler = CronScheduler::new(Arc::clone(&service))
        .await
        .map_err(|e| AppError::internal(format!("Scheduler init failed: {}", e)))?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    db.close().await;

    tracing::info!("IndexHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
