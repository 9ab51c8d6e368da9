//! Dead-letter CLI commands.

use clap::{Args, Subcommand};

use indexhub_core::error::AppError;
use indexhub_core::types::PageRequest;

use crate::output::{self, DeadLetterRow, OutputFormat};

/// Arguments for dead-letter commands
#[derive(Debug, Args)]
pub struct DeadLettersArgs {
    /// Dead-letter subcommand
    #[command(subcommand)]
    pub command: DeadLettersCommand,
}

/// Dead-letter subcommands
#[derive(Debug, Subcommand)]
pub enum DeadLettersCommand {
    /// List dead letters, newest first
    List {
        /// Page size
        #[arg(short, long, default_value_t = 25)]
        limit: u64,
        /// Rows to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
    },
    /// Enqueue a fresh job from a dead letter's payload
    Replay {
        /// Dead letter id
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Execute dead-letter commands
pub async fn execute(
    args: &DeadLettersArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::create_service(config_path).await?;
    let queue = service.queue();

    match &args.command {
        DeadLettersCommand::List { limit, offset } => {
            let page = queue
                .list_dead_letters(&PageRequest::new(*limit, *offset))
                .await?;
            let rows: Vec<DeadLetterRow> = page.items.iter().map(DeadLetterRow::from).collect();
            output::print_list(&rows, format);
        }
        DeadLettersCommand::Replay { id, yes } => {
            let entry = queue.get_dead_letter(*id).await?;

            if !yes {
                output::print_item(&entry.payload);
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Re-enqueue this '{}' job?", entry.job_type))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let job_id = queue.replay_dead_letter(entry.id).await?;
            output::print_success(&format!("Dead letter {} replayed as job {job_id}", entry.id));
        }
    }

    Ok(())
}
