//! Table and JSON output formatting for CLI commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::Job;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print a single item as JSON (both formats; the records are nested)
pub fn print_item<T: Serialize>(item: &T) {
    let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
    println!("{json}");
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// One job as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct JobRow {
    /// Job id
    #[tabled(rename = "ID")]
    pub id: i64,
    /// Job type
    #[tabled(rename = "Type")]
    pub job_type: String,
    /// Status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Attempts over max attempts
    #[tabled(rename = "Attempts")]
    pub attempts: String,
    /// Target item
    #[tabled(rename = "Target")]
    pub target: String,
    /// Earliest claim time
    #[tabled(rename = "Run After")]
    pub run_after: String,
    /// Last update
    #[tabled(rename = "Updated")]
    pub updated_at: String,
    /// Last error, truncated
    #[tabled(rename = "Last Error")]
    pub last_error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            target: job
                .target_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            run_after: timestamp(job.run_after),
            updated_at: timestamp(Some(job.updated_at)),
            last_error: job
                .last_error
                .as_deref()
                .map(|e| truncate(e, 48))
                .unwrap_or_default(),
        }
    }
}

/// One dead letter as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct DeadLetterRow {
    /// Dead letter id
    #[tabled(rename = "ID")]
    pub id: i64,
    /// Job that failed
    #[tabled(rename = "Job")]
    pub original_job_id: i64,
    /// Job type
    #[tabled(rename = "Type")]
    pub job_type: String,
    /// Failure reason, truncated
    #[tabled(rename = "Reason")]
    pub reason: String,
    /// When the job failed
    #[tabled(rename = "Failed At")]
    pub failed_at: String,
}

impl From<&DeadLetter> for DeadLetterRow {
    fn from(entry: &DeadLetter) -> Self {
        Self {
            id: entry.id,
            original_job_id: entry.original_job_id,
            job_type: entry.job_type.clone(),
            reason: truncate(&entry.reason, 64),
            failed_at: timestamp(Some(entry.failed_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
