//! In-memory job store using a Tokio mutex.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use indexhub_core::error::AppError;
use indexhub_core::result::AppResult;
use indexhub_core::types::pagination::{PageRequest, PageResponse};
use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::{Job, JobStatus, NewJob, QueueStats};

use crate::store::{EnqueueOutcome, JobStore};

/// Internal state for the memory-based job store.
#[derive(Debug, Default)]
struct InnerState {
    /// Jobs keyed by id; iteration order is claim order.
    jobs: BTreeMap<i64, Job>,
    /// Dead letters keyed by id.
    dead_letters: BTreeMap<i64, DeadLetter>,
    /// Last job id handed out.
    last_job_id: i64,
    /// Last dead-letter id handed out.
    last_dead_letter_id: i64,
}

impl InnerState {
    fn running_job_mut(&mut self, id: i64) -> AppResult<&mut Job> {
        match self.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Running => Ok(job),
            Some(job) => Err(AppError::conflict(format!(
                "Job {id} is {}, not running",
                job.status
            ))),
            None => Err(AppError::not_found(format!("Job {id} not found"))),
        }
    }
}

/// In-memory job store.
///
/// Every operation holds the same mutex for its whole duration, which makes
/// each one (the claim in particular) atomic with respect to the others.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone + serde::Serialize>(
    items: Vec<&T>,
    page: &PageRequest,
) -> PageResponse<T> {
    let total = items.len() as u64;
    let slice = items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect();
    PageResponse::new(slice, page, total)
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_deduped(&self, job: &NewJob, now: DateTime<Utc>) -> AppResult<EnqueueOutcome> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state
            .jobs
            .values()
            .find(|j| j.status.is_pending() && j.dedupe_key == job.dedupe_key)
        {
            return Ok(EnqueueOutcome {
                job_id: existing.id,
                created: false,
            });
        }

        state.last_job_id += 1;
        let id = state.last_job_id;
        state.jobs.insert(
            id,
            Job {
                id,
                job_type: job.job_type.clone(),
                target_id: job.target_id,
                payload: job.payload.clone(),
                status: JobStatus::Queued,
                attempts: 0,
                max_attempts: job.max_attempts,
                last_error: None,
                locked: false,
                locked_at: None,
                runner_id: None,
                dedupe_key: job.dedupe_key.clone(),
                run_after: job.run_after,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(EnqueueOutcome {
            job_id: id,
            created: true,
        })
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Job>> {
        let state = self.state.lock().await;
        let matching: Vec<&Job> = state
            .jobs
            .values()
            .rev()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn stats(&self) -> AppResult<QueueStats> {
        let state = self.state.lock().await;
        let mut stats = QueueStats::default();
        for job in state.jobs.values() {
            stats.record(job.status, 1);
        }
        Ok(stats)
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.jobs.values().filter(|j| j.status == status).count() as i64)
    }

    async fn claim_next(&self, runner_id: &str, now: DateTime<Utc>) -> AppResult<Option<Job>> {
        let mut state = self.state.lock().await;

        let Some(job) = state.jobs.values_mut().find(|j| j.is_claimable(now)) else {
            return Ok(None);
        };

        job.status = JobStatus::Running;
        job.locked = true;
        job.locked_at = Some(now);
        job.runner_id = Some(runner_id.to_string());
        job.updated_at = now;

        debug!(job_id = job.id, runner_id, "Claimed job");
        Ok(Some(job.clone()))
    }

    async fn record_attempt(&self, id: i64, now: DateTime<Utc>) -> AppResult<i32> {
        let mut state = self.state.lock().await;
        let job = state.running_job_mut(id)?;
        job.attempts += 1;
        job.updated_at = now;
        Ok(job.attempts)
    }

    async fn mark_completed(&self, id: i64, now: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let job = state.running_job_mut(id)?;
        job.status = JobStatus::Completed;
        job.locked = false;
        job.updated_at = now;
        Ok(())
    }

    async fn requeue(
        &self,
        id: i64,
        error: &str,
        run_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let job = state.running_job_mut(id)?;
        job.status = JobStatus::Queued;
        job.locked = false;
        job.locked_at = None;
        job.run_after = Some(run_after);
        job.last_error = Some(error.to_string());
        job.updated_at = now;
        Ok(())
    }

    async fn fail_permanently(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DeadLetter> {
        let mut state = self.state.lock().await;

        let job = state.running_job_mut(id)?;
        job.status = JobStatus::Failed;
        job.locked = false;
        job.last_error = Some(error.to_string());
        job.updated_at = now;
        let job_type = job.job_type.clone();
        let payload = job.payload.clone();

        state.last_dead_letter_id += 1;
        let entry = DeadLetter {
            id: state.last_dead_letter_id,
            original_job_id: id,
            job_type,
            payload,
            reason: error.to_string(),
            failed_at: now,
        };
        state.dead_letters.insert(entry.id, entry.clone());

        Ok(entry)
    }

    async fn reclaim_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut reclaimed = 0u64;

        for job in state.jobs.values_mut() {
            if job.locked && job.locked_at.is_some_and(|at| at < cutoff) {
                job.status = JobStatus::Queued;
                job.locked = false;
                job.locked_at = None;
                job.runner_id = None;
                job.updated_at = now;
                reclaimed += 1;
            }
        }

        Ok(reclaimed)
    }

    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.jobs.len();
        state
            .jobs
            .retain(|_, j| !(j.status.is_terminal() && j.updated_at < cutoff));
        Ok((before - state.jobs.len()) as u64)
    }

    async fn list_dead_letters(&self, page: &PageRequest) -> AppResult<PageResponse<DeadLetter>> {
        let state = self.state.lock().await;
        let entries: Vec<&DeadLetter> = state.dead_letters.values().rev().collect();
        Ok(paginate(entries, page))
    }

    async fn find_dead_letter(&self, id: i64) -> AppResult<Option<DeadLetter>> {
        Ok(self.state.lock().await.dead_letters.get(&id).cloned())
    }

    async fn purge_dead_letters_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.dead_letters.len();
        state.dead_letters.retain(|_, d| d.failed_at >= cutoff);
        Ok((before - state.dead_letters.len()) as u64)
    }
}
