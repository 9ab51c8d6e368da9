//! Dead-letter entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Forensic record of a job that exhausted its attempts.
///
/// Written exactly once, when the job transitions to `failed`, and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeadLetter {
    /// Dead-letter identifier.
    pub id: i64,
    /// The job that failed.
    pub original_job_id: i64,
    /// Type of the failed job, kept so the entry can be replayed.
    pub job_type: String,
    /// Verbatim copy of the failed job's payload.
    pub payload: serde_json::Value,
    /// Last error recorded on the job.
    pub reason: String,
    /// When the job was dead-lettered.
    pub failed_at: DateTime<Utc>,
}
