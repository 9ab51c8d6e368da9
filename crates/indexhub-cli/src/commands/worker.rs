//! Worker management CLI commands.

use clap::{Args, Subcommand};

use indexhub_core::error::AppError;
use indexhub_worker::jobs::REINDEX_ALL_COOLDOWN;

use crate::output::{self, OutputFormat};

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Run one worker cycle now
    Run {
        /// Override the manual batch limit; skips rate limiting and admission checks
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show queue, lease and admission status
    Status,
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::create_service(config_path).await?;

    match &args.command {
        WorkerCommand::Run { limit } => {
            let report = match limit {
                Some(limit) => service.runner().run_cycle(*limit).await?,
                None => service.run_manual().await?,
            };

            match format {
                OutputFormat::Json => output::print_item(&report),
                OutputFormat::Table => {
                    if !report.lease_acquired {
                        output::print_warning("Another worker holds the lease; nothing was run.");
                        return Ok(());
                    }
                    println!("Worker Cycle:");
                    output::print_kv("Processed", &report.processed.to_string());
                    output::print_kv("Succeeded", &report.succeeded.to_string());
                    output::print_kv("Failed", &report.failed.to_string());
                    output::print_kv("Dead-lettered", &report.dead_lettered.to_string());
                    output::print_kv("Reclaimed", &report.reclaimed.to_string());
                }
            }
        }
        WorkerCommand::Status => {
            let config = service.config();
            let stats = service.queue().get_queue_stats().await?;
            let lease = service.runner().lease().current().await?;
            let admission = service.admission().may_start_cycle().await?;
            let usage = service
                .admission()
                .quota()
                .usage_today(&config.indexer.provider)
                .await?;
            let last_reindex = service.cooldown().last_run(REINDEX_ALL_COOLDOWN).await?;

            if format == OutputFormat::Json {
                output::print_item(&serde_json::json!({
                    "queue": stats,
                    "lease": lease,
                    "admission": admission.to_string(),
                    "usage_today": usage,
                    "last_full_reindex": last_reindex,
                }));
                return Ok(());
            }

            println!("Worker Queue Status:");
            output::print_kv("Queued", &stats.queued.to_string());
            output::print_kv("Running", &stats.running.to_string());
            output::print_kv("Completed", &stats.completed.to_string());
            output::print_kv("Failed", &stats.failed.to_string());
            output::print_kv("Total", &stats.total.to_string());
            output::print_kv("Worker Enabled", &config.worker.enabled.to_string());
            output::print_kv("Schedule", &config.worker.schedule);
            output::print_kv(
                "Lease",
                &lease
                    .map(|l| format!("{} since {}", l.holder_id, l.acquired_at))
                    .unwrap_or_else(|| "free".to_string()),
            );
            output::print_kv("Admission", &admission.to_string());
            output::print_kv(
                "Usage Today",
                &format!(
                    "{} requests, {} tokens, cost {:.4}",
                    usage.requests, usage.tokens, usage.cost
                ),
            );
            output::print_kv(
                "Last Full Reindex",
                &last_reindex
                    .map(|at| at.to_string())
                    .unwrap_or_else(|| "never".to_string()),
            );
        }
    }

    Ok(())
}
