//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::dedupe::derive_dedupe_key;
use super::status::JobStatus;

/// A unit of deferred, typed, retryable work.
///
/// `locked` mirrors `status == Running` but is tracked independently so the
/// stale sweep can find abandoned claims by `locked_at` alone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Monotonic job identifier.
    pub id: i64,
    /// Job type (e.g. `"embed_content"`, `"reindex_all"`).
    pub job_type: String,
    /// Content item this job targets, if any.
    pub target_id: Option<i64>,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Current job status.
    pub status: JobStatus,
    /// Executions started so far.
    pub attempts: i32,
    /// Executions allowed before the job is dead-lettered.
    pub max_attempts: i32,
    /// Error message from the most recent failed execution.
    pub last_error: Option<String>,
    /// Whether a worker currently holds the job.
    pub locked: bool,
    /// When the job was claimed.
    pub locked_at: Option<DateTime<Utc>>,
    /// Identity of the claiming worker instance.
    pub runner_id: Option<String>,
    /// Key that at most one pending job may hold.
    pub dedupe_key: String,
    /// The job is not claimable before this instant.
    pub run_after: Option<DateTime<Utc>>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check whether another failure would exhaust the job's attempts.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Check whether the job may be claimed at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Queued && self.run_after.is_none_or(|at| at <= now)
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Job type identifier.
    pub job_type: String,
    /// Content item the job targets, if any.
    pub target_id: Option<i64>,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Attempts allowed before dead-lettering.
    pub max_attempts: i32,
    /// Dedupe key derived from type and payload.
    pub dedupe_key: String,
    /// Earliest claim time.
    pub run_after: Option<DateTime<Utc>>,
}

impl NewJob {
    /// Build a new job, deriving its dedupe key and target from the payload.
    pub fn new(job_type: impl Into<String>, payload: serde_json::Value, max_attempts: i32) -> Self {
        let job_type = job_type.into();
        let dedupe = derive_dedupe_key(&job_type, &payload);
        Self {
            job_type,
            target_id: dedupe.target_id,
            payload,
            max_attempts,
            dedupe_key: dedupe.key,
            run_after: None,
        }
    }

    /// Delay the job until `at`.
    pub fn run_after(mut self, at: DateTime<Utc>) -> Self {
        self.run_after = Some(at);
        self
    }
}

/// Aggregate job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting to be claimed.
    pub queued: i64,
    /// Jobs currently claimed.
    pub running: i64,
    /// Jobs finished successfully.
    pub completed: i64,
    /// Jobs that exhausted their attempts.
    pub failed: i64,
    /// All jobs.
    pub total: i64,
}

impl QueueStats {
    /// Add `count` jobs with `status` to the tally.
    pub fn record(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Queued => self.queued += count,
            JobStatus::Running => self.running += count,
            JobStatus::Completed => self.completed += count,
            JobStatus::Failed => self.failed += count,
        }
        self.total += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_job_derives_target() {
        let job = NewJob::new("embed_content", json!({"item_id": 9}), 5);
        assert_eq!(job.target_id, Some(9));
        assert_eq!(job.dedupe_key, "embed_content:item:9");
        assert!(job.run_after.is_none());
    }

    #[test]
    fn test_stats_record() {
        let mut stats = QueueStats::default();
        stats.record(JobStatus::Queued, 3);
        stats.record(JobStatus::Failed, 1);
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 4);
    }
}
