//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use indexhub_core::error::{AppError, ErrorKind};
use indexhub_core::result::AppResult;
use indexhub_core::types::pagination::{PageRequest, PageResponse};
use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::{Job, JobStatus, NewJob, QueueStats};

use crate::store::{EnqueueOutcome, JobStore};

/// How many times an insert is retried when the conflicting pending job
/// finishes between the insert and the lookup.
const DEDUPE_RETRIES: usize = 3;

/// Repository for background job queue operations.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the pending job holding a dedupe key.
    async fn find_pending_by_dedupe_key(&self, key: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM index_jobs \
             WHERE dedupe_key = $1 AND status IN ('queued', 'running') \
             LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up dedupe key", e))
    }

    /// Check that a conditional transition touched exactly one running row.
    fn expect_transition(id: i64, rows: u64, action: &str) -> AppResult<()> {
        if rows == 0 {
            return Err(AppError::conflict(format!(
                "Cannot {action} job {id}: it is not running"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_deduped(&self, job: &NewJob, now: DateTime<Utc>) -> AppResult<EnqueueOutcome> {
        for _ in 0..DEDUPE_RETRIES {
            let inserted = sqlx::query_scalar::<_, i64>(
                "INSERT INTO index_jobs \
                    (job_type, target_id, payload, status, attempts, max_attempts, locked, \
                     dedupe_key, run_after, created_at, updated_at) \
                 VALUES ($1, $2, $3, 'queued', 0, $4, FALSE, $5, $6, $7, $7) \
                 ON CONFLICT (dedupe_key) WHERE status IN ('queued', 'running') DO NOTHING \
                 RETURNING id",
            )
            .bind(&job.job_type)
            .bind(job.target_id)
            .bind(&job.payload)
            .bind(job.max_attempts)
            .bind(&job.dedupe_key)
            .bind(job.run_after)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert job", e))?;

            if let Some(job_id) = inserted {
                return Ok(EnqueueOutcome {
                    job_id,
                    created: true,
                });
            }

            if let Some(job_id) = self.find_pending_by_dedupe_key(&job.dedupe_key).await? {
                return Ok(EnqueueOutcome {
                    job_id,
                    created: false,
                });
            }
        }

        Err(AppError::conflict(format!(
            "Dedupe key '{}' kept changing hands during enqueue",
            job.dedupe_key
        )))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM index_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find job", e))
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Job>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM index_jobs \
             WHERE ($1::index_job_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))?;

        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM index_jobs \
             WHERE ($1::index_job_status IS NULL OR status = $1) \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list jobs", e))?;

        Ok(PageResponse::new(jobs, page, total as u64))
    }

    async fn stats(&self) -> AppResult<QueueStats> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM index_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load job stats", e))?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            stats.record(status, count);
        }
        Ok(stats)
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM index_jobs WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count jobs", e))
    }

    /// Single conditional `UPDATE ... RETURNING`: the row lock taken by
    /// `FOR UPDATE SKIP LOCKED` plus the outer `status = 'queued'` check
    /// guarantee that at most one caller transitions a given job.
    async fn claim_next(&self, runner_id: &str, now: DateTime<Utc>) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>(
            "UPDATE index_jobs SET status = 'running', locked = TRUE, locked_at = $2, \
             runner_id = $1, updated_at = $2 \
             WHERE id = ( \
                SELECT id FROM index_jobs \
                WHERE status = 'queued' AND (run_after IS NULL OR run_after <= $2) \
                ORDER BY id ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT 1 \
             ) AND status = 'queued' \
             RETURNING *",
        )
        .bind(runner_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim job", e))
    }

    async fn record_attempt(&self, id: i64, now: DateTime<Utc>) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE index_jobs SET attempts = attempts + 1, updated_at = $2 \
             WHERE id = $1 AND status = 'running' RETURNING attempts",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record attempt", e))?
        .ok_or_else(|| AppError::conflict(format!("Cannot record attempt: job {id} is not running")))
    }

    async fn mark_completed(&self, id: i64, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE index_jobs SET status = 'completed', locked = FALSE, updated_at = $2 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job", e))?;
        Self::expect_transition(id, result.rows_affected(), "complete")
    }

    async fn requeue(
        &self,
        id: i64,
        error: &str,
        run_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE index_jobs SET status = 'queued', locked = FALSE, locked_at = NULL, \
             run_after = $3, last_error = $2, updated_at = $4 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(error)
        .bind(run_after)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to requeue job", e))?;
        Self::expect_transition(id, result.rows_affected(), "requeue")
    }

    async fn fail_permanently(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DeadLetter> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let job = sqlx::query_as::<_, Job>(
            "UPDATE index_jobs SET status = 'failed', locked = FALSE, last_error = $2, \
             updated_at = $3 \
             WHERE id = $1 AND status = 'running' RETURNING *",
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark job as failed", e))?
        .ok_or_else(|| AppError::conflict(format!("Cannot fail job {id}: it is not running")))?;

        let entry = sqlx::query_as::<_, DeadLetter>(
            "INSERT INTO index_dead_letters (original_job_id, job_type, payload, reason, failed_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(error)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write dead letter", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit dead letter", e)
        })?;

        Ok(entry)
    }

    async fn reclaim_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE index_jobs SET status = 'queued', locked = FALSE, locked_at = NULL, \
             runner_id = NULL, updated_at = $2 \
             WHERE locked = TRUE AND locked_at < $1",
        )
        .bind(cutoff)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reclaim stale jobs", e))?;
        Ok(result.rows_affected())
    }

    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM index_jobs WHERE status IN ('completed', 'failed') AND updated_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cleanup jobs", e))?;
        Ok(result.rows_affected())
    }

    async fn list_dead_letters(&self, page: &PageRequest) -> AppResult<PageResponse<DeadLetter>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_dead_letters")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count dead letters", e)
            })?;

        let entries = sqlx::query_as::<_, DeadLetter>(
            "SELECT * FROM index_dead_letters ORDER BY id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list dead letters", e))?;

        Ok(PageResponse::new(entries, page, total as u64))
    }

    async fn find_dead_letter(&self, id: i64) -> AppResult<Option<DeadLetter>> {
        sqlx::query_as::<_, DeadLetter>("SELECT * FROM index_dead_letters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find dead letter", e))
    }

    async fn purge_dead_letters_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM index_dead_letters WHERE failed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to purge dead letters", e)
            })?;
        Ok(result.rows_affected())
    }
}
