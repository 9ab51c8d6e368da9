//! Job queue CLI commands.

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};

use indexhub_core::error::AppError;
use indexhub_core::result::AppResult;
use indexhub_core::types::PageRequest;
use indexhub_entity::job::{JobKind, JobStatus};
use indexhub_worker::EnqueueOptions;

use crate::output::{self, JobRow, OutputFormat};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobsArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Enqueue a job
    Enqueue {
        /// Job type (embed_content, reindex_item, reindex_all, cleanup)
        job_type: String,
        /// JSON payload; `reindex_all` defaults to a walk over the configured item types
        #[arg(short, long)]
        payload: Option<String>,
        /// Attempts before dead-lettering
        #[arg(long)]
        max_attempts: Option<i32>,
        /// Delay before the job becomes claimable
        #[arg(long)]
        delay_seconds: Option<i64>,
        /// Bypass the cooldown when starting a default `reindex_all`
        #[arg(long)]
        force: bool,
    },
    /// List jobs, newest first
    List {
        /// Filter by status (queued, running, completed, failed)
        #[arg(short, long)]
        status: Option<JobStatus>,
        /// Page size
        #[arg(short, long, default_value_t = 25)]
        limit: u64,
        /// Rows to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
    },
    /// Show one job
    Show {
        /// Job id
        id: i64,
    },
    /// Delete completed and failed jobs older than the retention window
    Cleanup {
        /// Retention in days; defaults to the configured value
        #[arg(short, long)]
        days: Option<u32>,
    },
}

/// Execute job commands
pub async fn execute(
    args: &JobsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::create_service(config_path).await?;
    let queue = service.queue();

    match &args.command {
        JobsCommand::Enqueue {
            job_type,
            payload,
            max_attempts,
            delay_seconds,
            force,
        } => {
            if payload.is_none() && job_type == JobKind::ReindexAll.as_str() {
                let job_id = service.enqueue_full_reindex(*force).await?;
                output::print_success(&format!("Full reindex enqueued (id: {job_id})"));
                return Ok(());
            }

            let payload_value: serde_json::Value = match payload {
                Some(raw) => serde_json::from_str(raw)
                    .map_err(|e| AppError::validation(format!("Invalid JSON payload: {e}")))?,
                None => serde_json::json!({}),
            };
            let options = EnqueueOptions {
                max_attempts: *max_attempts,
                run_after: delayed_run_after(queue.clock().now(), *delay_seconds)?,
            };

            let outcome = queue.enqueue_with(job_type, payload_value, options).await?;
            if outcome.created {
                output::print_success(&format!("Job '{job_type}' enqueued (id: {})", outcome.job_id));
            } else {
                output::print_warning(&format!(
                    "Job '{job_type}' already pending (id: {})",
                    outcome.job_id
                ));
            }
        }
        JobsCommand::List {
            status,
            limit,
            offset,
        } => {
            let page = queue
                .list_jobs(*status, &PageRequest::new(*limit, *offset))
                .await?;
            let rows: Vec<JobRow> = page.items.iter().map(JobRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table && page.has_next {
                println!("({} of {} shown)", rows.len(), page.total_items);
            }
        }
        JobsCommand::Show { id } => {
            let job = queue.get(*id).await?;
            output::print_item(&job);
        }
        JobsCommand::Cleanup { days } => {
            let days = days.unwrap_or(service.config().worker.cleanup_retention_days);
            let deleted = queue.cleanup_older_than(days).await?;
            output::print_success(&format!("Deleted {deleted} jobs older than {days} days"));
        }
    }

    Ok(())
}

/// Resolve `--delay-seconds` against the queue's clock.
fn delayed_run_after(now: DateTime<Utc>, delay_seconds: Option<i64>) -> AppResult<Option<DateTime<Utc>>> {
    let Some(seconds) = delay_seconds else {
        return Ok(None);
    };
    Duration::try_seconds(seconds)
        .and_then(|delay| now.checked_add_signed(delay))
        .map(Some)
        .ok_or_else(|| AppError::validation(format!("Delay of {seconds}s is out of range")))
}
