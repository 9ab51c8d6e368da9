//! Bulk indexing CLI commands.

use clap::{Args, Subcommand};

use indexhub_core::error::AppError;
use indexhub_entity::state::CursorProgress;

use crate::output::{self, OutputFormat};

/// Arguments for bulk commands
#[derive(Debug, Args)]
pub struct BulkArgs {
    /// Bulk subcommand
    #[command(subcommand)]
    pub command: BulkCommand,
}

/// Bulk subcommands
#[derive(Debug, Subcommand)]
pub enum BulkCommand {
    /// Start a new walk from the first item
    Start {
        /// Items per tick; defaults to the configured batch size
        #[arg(short, long)]
        batch_size: Option<u32>,
        /// Stop after this many items
        #[arg(short, long)]
        max_total: Option<u64>,
    },
    /// Pause the walk
    Stop,
    /// Continue a paused walk
    Resume,
    /// Show walk progress
    Status,
}

fn print_progress(progress: &CursorProgress, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_item(progress);
        return;
    }
    output::print_kv("Running", &progress.running.to_string());
    output::print_kv("Finished", &progress.finished.to_string());
    output::print_kv("Offset", &progress.offset.to_string());
    output::print_kv("Batch Size", &progress.batch_size.to_string());
    output::print_kv("Processed", &progress.total_processed.to_string());
    output::print_kv(
        "Max Total",
        &progress
            .max_total
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unbounded".to_string()),
    );
    output::print_kv(
        "Last Run",
        &progress
            .last_run
            .map(|at| at.to_string())
            .unwrap_or_else(|| "never".to_string()),
    );
}

/// Execute bulk commands
pub async fn execute(
    args: &BulkArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::create_service(config_path).await?;
    let bulk = service.bulk();

    match &args.command {
        BulkCommand::Start {
            batch_size,
            max_total,
        } => {
            let batch_size = batch_size.unwrap_or(service.config().indexer.bulk_batch_size);
            let progress = bulk.start(batch_size, *max_total).await?;
            output::print_success("Bulk indexing started.");
            print_progress(&progress, format);
        }
        BulkCommand::Stop => {
            let progress = bulk.stop().await?;
            output::print_success("Bulk indexing stopped.");
            print_progress(&progress, format);
        }
        BulkCommand::Resume => {
            let progress = bulk.resume().await?;
            output::print_success("Bulk indexing resumed.");
            print_progress(&progress, format);
        }
        BulkCommand::Status => match bulk.status().await? {
            Some(progress) => print_progress(&progress, format),
            None => output::print_warning("Bulk indexing was never started."),
        },
    }

    Ok(())
}
