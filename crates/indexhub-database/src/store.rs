//! Store traits for the job queue.
//!
//! Two implementations are provided:
//! - PostgreSQL (`repositories`), where the claim is a single
//!   `UPDATE ... RETURNING` statement
//! - In-memory (`memory`), where every operation runs under one
//!   `tokio::sync::Mutex`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use indexhub_core::result::AppResult;
use indexhub_core::types::pagination::{PageRequest, PageResponse};
use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::{Job, JobStatus, NewJob, QueueStats};

/// Result of a deduplicated insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// The new job, or the pending job that already held the dedupe key.
    pub job_id: i64,
    /// Whether a row was inserted.
    pub created: bool,
}

/// Persistence for jobs and dead letters.
///
/// Every state transition is conditional on the row's current status, so a
/// transition that lost a race affects zero rows instead of clobbering
/// another worker's state.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert `job` unless a queued or running job already holds its
    /// dedupe key, in which case that job's id is returned.
    async fn insert_deduped(&self, job: &NewJob, now: DateTime<Utc>) -> AppResult<EnqueueOutcome>;

    /// Find a job by id.
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Job>>;

    /// List jobs, newest first, optionally filtered by status.
    async fn list(
        &self,
        status: Option<JobStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Job>>;

    /// Count jobs in every status.
    async fn stats(&self) -> AppResult<QueueStats>;

    /// Count jobs in one status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;

    /// Atomically claim the lowest-id queued job whose `run_after` has
    /// elapsed. Returns `None` when nothing was claimable or another
    /// caller won the row.
    async fn claim_next(&self, runner_id: &str, now: DateTime<Utc>) -> AppResult<Option<Job>>;

    /// Increment the attempt counter of a running job and return the new value.
    async fn record_attempt(&self, id: i64, now: DateTime<Utc>) -> AppResult<i32>;

    /// Transition a running job to `completed`.
    async fn mark_completed(&self, id: i64, now: DateTime<Utc>) -> AppResult<()>;

    /// Return a running job to `queued`, eligible again at `run_after`.
    async fn requeue(
        &self,
        id: i64,
        error: &str,
        run_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Transition a running job to `failed` and write its dead-letter
    /// entry in the same unit of work.
    async fn fail_permanently(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DeadLetter>;

    /// Reset jobs locked before `cutoff` back to `queued`. Returns the
    /// number of jobs reclaimed.
    async fn reclaim_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<u64>;

    /// Delete `completed`/`failed` jobs last updated before `cutoff`.
    async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// List dead letters, newest first.
    async fn list_dead_letters(&self, page: &PageRequest) -> AppResult<PageResponse<DeadLetter>>;

    /// Find a dead letter by id.
    async fn find_dead_letter(&self, id: i64) -> AppResult<Option<DeadLetter>>;

    /// Delete dead letters written before `cutoff`.
    async fn purge_dead_letters_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Keyed JSON records: leases, cooldowns, cursor progress, rate windows,
/// and the quota ledger.
///
/// Reads and writes are independent; callers that read-modify-write get
/// advisory, not transactional, semantics.
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a record. Records whose expiry is at or before `now` read as absent.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> AppResult<Option<Value>>;

    /// Insert or overwrite a record.
    async fn put(
        &self,
        key: &str,
        value: Value,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Delete a record. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;
}

/// Typed access to a [`StateStore`].
#[async_trait]
pub trait StateStoreExt {
    /// Get a record and deserialize it.
    async fn get_typed<T: DeserializeOwned + Send>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<T>>;

    /// Serialize and store a record.
    async fn put_typed<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

#[async_trait]
impl<S: StateStore + ?Sized> StateStoreExt for S {
    async fn get_typed<T: DeserializeOwned + Send>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<T>> {
        match self.get(key, now).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn put_typed<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let json = serde_json::to_value(value)?;
        self.put(key, json, expires_at, now).await
    }
}
