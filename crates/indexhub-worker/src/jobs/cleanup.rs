//! Queue maintenance handler.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use tracing;

use indexhub_entity::job::{CleanupPayload, Job, JobKind};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};
use crate::queue::JobQueue;

/// Deletes old terminal jobs, reclaims stale claims, and optionally
/// purges old dead letters.
#[derive(Debug)]
pub struct CleanupJobHandler {
    /// Job queue
    queue: Arc<JobQueue>,
    /// Default retention for terminal jobs
    retention_days: u32,
    /// Claims older than this are reclaimed
    stale_threshold: Duration,
    /// Dead letters older than this are purged; `None` keeps them
    dead_letter_retention_days: Option<u32>,
}

impl CleanupJobHandler {
    /// Create a new cleanup job handler
    pub fn new(
        queue: Arc<JobQueue>,
        retention_days: u32,
        stale_threshold: Duration,
        dead_letter_retention_days: Option<u32>,
    ) -> Self {
        Self {
            queue,
            retention_days,
            stale_threshold,
            dead_letter_retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for CleanupJobHandler {
    fn job_type(&self) -> &str {
        JobKind::Cleanup.as_str()
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: CleanupPayload = parse_payload(job)?;
        let retention_days = payload.retention_days.unwrap_or(self.retention_days);

        let deleted = self.queue.cleanup_older_than(retention_days).await?;
        let reclaimed = self.queue.reclaim_stale(self.stale_threshold).await?;
        let purged = match self.dead_letter_retention_days {
            Some(days) => self.queue.purge_dead_letters_older_than(days).await?,
            None => 0,
        };

        tracing::info!(job_id = job.id, deleted, reclaimed, purged, "Cleanup finished");

        Ok(Some(serde_json::json!({
            "deleted": deleted,
            "reclaimed": reclaimed,
            "dead_letters_purged": purged,
        })))
    }
}
