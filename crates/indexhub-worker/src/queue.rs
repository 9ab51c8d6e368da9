//! Job queue for enqueuing, claiming and settling background jobs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing;

use indexhub_core::error::AppError;
use indexhub_core::result::AppResult;
use indexhub_core::traits::Clock;
use indexhub_core::types::pagination::{PageRequest, PageResponse};
use indexhub_database::store::{EnqueueOutcome, JobStore};
use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::{Job, JobStatus, NewJob, QueueStats};

/// Per-call overrides for [`JobQueue::enqueue_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Attempts allowed before dead-lettering. Falls back to the queue default.
    pub max_attempts: Option<i32>,
    /// Earliest claim time. Instants at or before now are ignored.
    pub run_after: Option<DateTime<Utc>>,
}

/// Queue manager over a [`JobStore`].
///
/// Enqueue is synchronous and poll-based: nothing wakes a running worker,
/// the next cycle simply finds the job.
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Job persistence
    store: Arc<dyn JobStore>,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Attempts given to jobs enqueued without an override
    default_max_attempts: i32,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>, default_max_attempts: i32) -> Self {
        Self {
            store,
            clock,
            default_max_attempts: default_max_attempts.max(1),
        }
    }

    /// The clock this queue stamps jobs with
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Enqueue a job with default options.
    ///
    /// Returns the id of the new job, or of the queued/running job that
    /// already holds the same dedupe key.
    pub async fn enqueue(&self, job_type: &str, payload: Value) -> AppResult<i64> {
        let outcome = self
            .enqueue_with(job_type, payload, EnqueueOptions::default())
            .await?;
        Ok(outcome.job_id)
    }

    /// Enqueue a job with explicit options and report whether it was created.
    pub async fn enqueue_with(
        &self,
        job_type: &str,
        payload: Value,
        options: EnqueueOptions,
    ) -> AppResult<EnqueueOutcome> {
        if job_type.trim().is_empty() {
            return Err(AppError::validation("Job type must not be empty"));
        }

        let max_attempts = options.max_attempts.unwrap_or(self.default_max_attempts);
        if max_attempts < 1 {
            return Err(AppError::validation(format!(
                "max_attempts must be at least 1, got {max_attempts}"
            )));
        }

        let now = self.clock.now();
        let mut job = NewJob::new(job_type, payload, max_attempts);
        if let Some(at) = options.run_after.filter(|at| *at > now) {
            job = job.run_after(at);
        }

        let outcome = self.store.insert_deduped(&job, now).await?;

        if outcome.created {
            tracing::debug!(
                job_id = outcome.job_id,
                job_type = %job.job_type,
                dedupe_key = %job.dedupe_key,
                "Enqueued job"
            );
        } else {
            tracing::debug!(
                job_id = outcome.job_id,
                job_type = %job.job_type,
                dedupe_key = %job.dedupe_key,
                "Job already pending, enqueue deduplicated"
            );
        }

        Ok(outcome)
    }

    /// Get a job by id
    pub async fn get(&self, job_id: i64) -> AppResult<Job> {
        self.store
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))
    }

    /// List jobs, newest first
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Job>> {
        self.store.list(status, page).await
    }

    /// Get queue statistics
    pub async fn get_queue_stats(&self) -> AppResult<QueueStats> {
        self.store.stats().await
    }

    /// Number of jobs currently claimed
    pub async fn count_running(&self) -> AppResult<i64> {
        self.store.count_by_status(JobStatus::Running).await
    }

    /// Delete completed and failed jobs last updated more than `days` ago.
    pub async fn cleanup_older_than(&self, days: u32) -> AppResult<u64> {
        let cutoff = self.retention_cutoff(days)?;
        let deleted = self.store.cleanup_older_than(cutoff).await?;
        tracing::info!(deleted, retention_days = days, "Cleaned up terminal jobs");
        Ok(deleted)
    }

    /// Claim the next eligible job for `runner_id`.
    pub async fn claim_next(&self, runner_id: &str) -> AppResult<Option<Job>> {
        let job = self.store.claim_next(runner_id, self.clock.now()).await?;
        match &job {
            Some(job) => tracing::debug!(
                job_id = job.id,
                job_type = %job.job_type,
                runner_id,
                "Claimed job"
            ),
            None => tracing::trace!(runner_id, "No claimable jobs"),
        }
        Ok(job)
    }

    /// Reset jobs locked for longer than `threshold` back to queued.
    pub async fn reclaim_stale(&self, threshold: Duration) -> AppResult<u64> {
        let now = self.clock.now();
        let reclaimed = self.store.reclaim_stale(now - threshold, now).await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "Reclaimed stale jobs");
        }
        Ok(reclaimed)
    }

    /// Count one execution of a running job. Returns the new attempt count.
    pub async fn record_attempt(&self, job_id: i64) -> AppResult<i32> {
        self.store.record_attempt(job_id, self.clock.now()).await
    }

    /// Mark a running job as completed
    pub async fn complete(&self, job_id: i64) -> AppResult<()> {
        self.store.mark_completed(job_id, self.clock.now()).await?;
        tracing::debug!(job_id, "Job completed");
        Ok(())
    }

    /// Return a running job to the queue, eligible again at `run_after`.
    pub async fn requeue(&self, job_id: i64, error: &str, run_after: DateTime<Utc>) -> AppResult<()> {
        self.store
            .requeue(job_id, error, run_after, self.clock.now())
            .await
    }

    /// Fail a running job terminally and write its dead letter.
    pub async fn fail_permanently(&self, job_id: i64, error: &str) -> AppResult<DeadLetter> {
        self.store
            .fail_permanently(job_id, error, self.clock.now())
            .await
    }

    /// List dead letters, newest first
    pub async fn list_dead_letters(&self, page: &PageRequest) -> AppResult<PageResponse<DeadLetter>> {
        self.store.list_dead_letters(page).await
    }

    /// Get a dead letter by id
    pub async fn get_dead_letter(&self, dead_letter_id: i64) -> AppResult<DeadLetter> {
        self.store
            .find_dead_letter(dead_letter_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dead letter {dead_letter_id} not found")))
    }

    /// Enqueue a fresh job from a dead letter's verbatim payload.
    ///
    /// The dead letter itself is left untouched.
    pub async fn replay_dead_letter(&self, dead_letter_id: i64) -> AppResult<i64> {
        let entry = self.get_dead_letter(dead_letter_id).await?;
        let job_id = self.enqueue(&entry.job_type, entry.payload.clone()).await?;

        tracing::info!(
            dead_letter_id,
            original_job_id = entry.original_job_id,
            job_id,
            "Replayed dead letter"
        );
        Ok(job_id)
    }

    /// Delete dead letters written more than `days` ago.
    pub async fn purge_dead_letters_older_than(&self, days: u32) -> AppResult<u64> {
        let cutoff = self.retention_cutoff(days)?;
        let purged = self.store.purge_dead_letters_older_than(cutoff).await?;
        tracing::info!(purged, retention_days = days, "Purged dead letters");
        Ok(purged)
    }

    fn retention_cutoff(&self, days: u32) -> AppResult<DateTime<Utc>> {
        Duration::try_days(i64::from(days))
            .and_then(|span| self.clock.now().checked_sub_signed(span))
            .ok_or_else(|| AppError::validation(format!("Retention of {days} days is out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indexhub_core::traits::ManualClock;
    use indexhub_database::memory::MemoryJobStore;
    use serde_json::json;

    fn queue() -> (JobQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let queue = JobQueue::new(Arc::new(MemoryJobStore::new()), clock.clone(), 5);
        (queue, clock)
    }

    #[tokio::test]
    async fn test_enqueue_rejects_empty_type() {
        let (queue, _) = queue();
        let err = queue.enqueue(" ", json!({})).await.unwrap_err();
        assert_eq!(err.kind, indexhub_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_enqueue_with_overrides_attempts() {
        let (queue, _) = queue();
        let outcome = queue
            .enqueue_with(
                "embed_content",
                json!({"item_id": 9}),
                EnqueueOptions {
                    max_attempts: Some(2),
                    run_after: None,
                },
            )
            .await
            .unwrap();

        assert!(outcome.created);
        let job = queue.get(outcome.job_id).await.unwrap();
        assert_eq!(job.max_attempts, 2);
        assert_eq!(job.target_id, Some(9));
        assert_eq!(job.attempts, 0);
        assert!(!job.locked);
    }

    #[tokio::test]
    async fn test_past_run_after_is_dropped() {
        let (queue, clock) = queue();
        let outcome = queue
            .enqueue_with(
                "cleanup",
                json!({}),
                EnqueueOptions {
                    max_attempts: None,
                    run_after: Some(clock.now() - Duration::minutes(5)),
                },
            )
            .await
            .unwrap();

        let job = queue.get(outcome.job_id).await.unwrap();
        assert!(job.run_after.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_job_is_not_found() {
        let (queue, _) = queue();
        let err = queue.get(404).await.unwrap_err();
        assert_eq!(err.kind, indexhub_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_out_of_range_retention_is_rejected() {
        let (queue, _) = queue();
        let err = queue.cleanup_older_than(u32::MAX).await.unwrap_err();
        assert_eq!(err.kind, indexhub_core::error::ErrorKind::Validation);
        let err = queue.purge_dead_letters_older_than(u32::MAX).await.unwrap_err();
        assert_eq!(err.kind, indexhub_core::error::ErrorKind::Validation);

        assert_eq!(queue.cleanup_older_than(30).await.unwrap(), 0);
    }
}
