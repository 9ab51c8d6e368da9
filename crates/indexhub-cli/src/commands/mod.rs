//! CLI command definitions and dispatch.

pub mod bulk;
pub mod dead_letters;
pub mod jobs;
pub mod migrate;
pub mod worker;

use clap::{Parser, Subcommand};

use indexhub_core::config::AppConfig;
use indexhub_core::error::AppError;
use indexhub_database::DatabasePool;
use indexhub_worker::{WorkerDeps, WorkerService};

use crate::output::OutputFormat;

/// IndexHub — content indexing job queue administration
#[derive(Debug, Parser)]
#[command(name = "indexhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Worker cycles and status
    Worker(worker::WorkerArgs),
    /// Job queue management
    Jobs(jobs::JobsArgs),
    /// Dead-letter inspection and replay
    DeadLetters(dead_letters::DeadLettersArgs),
    /// Bulk indexing walk control
    Bulk(bulk::BulkArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Worker(args) => worker::execute(args, &self.config, self.format).await,
            Commands::Jobs(args) => jobs::execute(args, &self.config, self.format).await,
            Commands::DeadLetters(args) => {
                dead_letters::execute(args, &self.config, self.format).await
            }
            Commands::Bulk(args) => bulk::execute(args, &self.config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_file(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {e}")))
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: load config, connect, and build the worker service
pub async fn create_service(config_path: &str) -> Result<WorkerService, AppError> {
    let config = load_config(config_path)?;
    let db = create_db_pool(&config).await?;
    let deps = WorkerDeps::postgres(&config, &db)?;
    WorkerService::new(config, deps)
}
