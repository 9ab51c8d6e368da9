//! Wiring of the queue, worker, admission control and bulk indexer.

use std::sync::Arc;

use chrono::Duration;
use tracing;
use uuid::Uuid;

use indexhub_core::config::{AppConfig, seconds_setting};
use indexhub_core::error::AppError;
use indexhub_core::result::AppResult;
use indexhub_core::traits::{Clock, ContentIndexer, ContentSource, SystemClock};
use indexhub_database::DatabasePool;
use indexhub_database::repositories::{PgContentSource, PgJobStore, PgStateStore};
use indexhub_database::store::{JobStore, StateStore};
use indexhub_entity::job::{JobKind, ReindexAllPayload};

use crate::admission::{Admission, AdmissionControl, ConcurrencyCap, CooldownGate, QuotaLedger, RateLimiter};
use crate::bulk::BulkIndexer;
use crate::executor::JobExecutor;
use crate::indexer::HttpContentIndexer;
use crate::jobs::{CleanupJobHandler, ItemIndexHandler, ReindexAllHandler};
use crate::lease::LeaseManager;
use crate::queue::JobQueue;
use crate::retry::RetryPolicy;
use crate::runner::{CycleReport, WorkerRunner};

/// Rate-limiter action for administrative worker runs.
pub const MANUAL_RUN_ACTION: &str = "worker.manual_run";

/// Backends and collaborators the worker runs against.
#[derive(Debug, Clone)]
pub struct WorkerDeps {
    /// Job and dead-letter persistence
    pub jobs: Arc<dyn JobStore>,
    /// Keyed state persistence
    pub state: Arc<dyn StateStore>,
    /// Pages of indexable content
    pub source: Arc<dyn ContentSource>,
    /// External indexing service
    pub indexer: Arc<dyn ContentIndexer>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl WorkerDeps {
    /// PostgreSQL stores, the HTTP indexing service and the system clock.
    ///
    /// Usage reported by the indexing service is recorded in the quota
    /// ledger that admission control reads.
    pub fn postgres(config: &AppConfig, db: &DatabasePool) -> AppResult<Self> {
        let pool = db.pool().clone();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let state: Arc<dyn StateStore> = Arc::new(PgStateStore::new(pool.clone()));
        let quota = Arc::new(QuotaLedger::new(
            state.clone(),
            clock.clone(),
            config.admission.quota_retention_days,
        ));
        let indexer = HttpContentIndexer::new(&config.indexer, Some(quota))?;

        Ok(Self {
            jobs: Arc::new(PgJobStore::new(pool.clone())),
            state,
            source: Arc::new(PgContentSource::new(pool)),
            indexer: Arc::new(indexer),
            clock,
        })
    }
}

/// Entry point for everything that starts or inspects work.
#[derive(Debug)]
pub struct WorkerService {
    config: AppConfig,
    queue: Arc<JobQueue>,
    runner: WorkerRunner,
    admission: AdmissionControl,
    rate_limiter: RateLimiter,
    manual_run_window: Duration,
    cooldown: CooldownGate,
    bulk: BulkIndexer,
}

impl WorkerService {
    /// Build the service and register the built-in handlers.
    ///
    /// Fails with a configuration error when a duration setting is out of
    /// range.
    pub fn new(config: AppConfig, deps: WorkerDeps) -> AppResult<Self> {
        let worker = &config.worker;
        let admission_config = &config.admission;

        let cooldown_period = seconds_setting(
            "admission.reindex_cooldown_seconds",
            admission_config.reindex_cooldown_seconds,
        )?;
        let stale_threshold =
            seconds_setting("worker.stale_threshold_seconds", worker.stale_threshold_seconds)?;
        let lease_ttl = seconds_setting("worker.lease_ttl_seconds", worker.lease_ttl_seconds)?;
        let manual_run_window = seconds_setting(
            "admission.manual_run_window_seconds",
            admission_config.manual_run_window_seconds,
        )?;
        let retry = RetryPolicy::from_config(&worker.backoff)?;

        let queue = Arc::new(JobQueue::new(
            deps.jobs.clone(),
            deps.clock.clone(),
            worker.default_max_attempts,
        ));
        let cooldown = CooldownGate::new(deps.state.clone(), deps.clock.clone(), cooldown_period);

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(ItemIndexHandler::embed(deps.indexer.clone())));
        executor.register(Arc::new(ItemIndexHandler::reindex(deps.indexer.clone())));
        executor.register(Arc::new(ReindexAllHandler::new(
            queue.clone(),
            deps.source.clone(),
            cooldown.clone(),
        )));
        executor.register(Arc::new(CleanupJobHandler::new(
            queue.clone(),
            worker.cleanup_retention_days,
            stale_threshold,
            worker.dead_letter_retention_days,
        )));

        let lease = LeaseManager::new(
            deps.state.clone(),
            deps.clock.clone(),
            &worker.lease_name,
            lease_ttl,
        );
        let runner = WorkerRunner::new(
            queue.clone(),
            Arc::new(executor),
            lease,
            retry,
            stale_threshold,
            format!("worker-{}", Uuid::new_v4()),
        );

        let admission = AdmissionControl::new(
            ConcurrencyCap::new(queue.clone(), admission_config.max_concurrent),
            QuotaLedger::new(
                deps.state.clone(),
                deps.clock.clone(),
                admission_config.quota_retention_days,
            ),
            config.indexer.provider.clone(),
            admission_config.daily_cost_limit,
        );

        let bulk = BulkIndexer::new(
            deps.state.clone(),
            deps.clock.clone(),
            deps.source,
            deps.indexer,
            config.indexer.item_types.clone(),
        );

        Ok(Self {
            queue,
            runner,
            admission,
            rate_limiter: RateLimiter::new(deps.state, deps.clock),
            manual_run_window,
            cooldown,
            bulk,
            config,
        })
    }

    /// The job queue
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// The worker runner
    pub fn runner(&self) -> &WorkerRunner {
        &self.runner
    }

    /// Admission control
    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// The `reindex_all` cooldown gate
    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    /// The bulk indexer
    pub fn bulk(&self) -> &BulkIndexer {
        &self.bulk
    }

    /// The configuration the service was built with
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one cycle at the worker's scheduled limit.
    ///
    /// Returns `None` when admission control defers the cycle.
    pub async fn run_scheduled(&self) -> AppResult<Option<CycleReport>> {
        let admission = self.admission.may_start_cycle().await?;
        if !admission.is_allowed() {
            tracing::info!(%admission, "Scheduled worker cycle deferred");
            return Ok(None);
        }
        self.runner
            .run_cycle(self.config.worker.scheduled_batch_limit)
            .await
            .map(Some)
    }

    /// Run one cycle at the manual limit, as an administrative action.
    ///
    /// Rejected with a rate-limit error when too many manual runs were
    /// requested in the configured window, and with a service-unavailable
    /// error when admission control defers it.
    pub async fn run_manual(&self) -> AppResult<CycleReport> {
        let admission_config = &self.config.admission;
        let allowed = self
            .rate_limiter
            .check(
                MANUAL_RUN_ACTION,
                admission_config.manual_run_limit,
                self.manual_run_window,
            )
            .await?;
        if !allowed {
            return Err(AppError::rate_limited(format!(
                "At most {} manual runs per {}s",
                admission_config.manual_run_limit, admission_config.manual_run_window_seconds
            )));
        }

        match self.admission.may_start_cycle().await? {
            Admission::Allowed => {
                self.runner
                    .run_cycle(self.config.worker.manual_batch_limit)
                    .await
            }
            deferred => Err(AppError::service_unavailable(format!(
                "Worker cycle deferred: {deferred}"
            ))),
        }
    }

    /// Start a `reindex_all` chain over the configured item types.
    pub async fn enqueue_full_reindex(&self, force: bool) -> AppResult<i64> {
        let payload = ReindexAllPayload {
            item_types: self.config.indexer.item_types.clone(),
            batch_size: self.config.indexer.bulk_batch_size.max(1),
            offset: 0,
            force,
        };
        let job_id = self
            .queue
            .enqueue(JobKind::ReindexAll.as_str(), serde_json::to_value(payload)?)
            .await?;
        tracing::info!(job_id, force, "Full reindex requested");
        Ok(job_id)
    }

    /// Enqueue the periodic cleanup job.
    pub async fn enqueue_cleanup(&self) -> AppResult<i64> {
        self.queue
            .enqueue(JobKind::Cleanup.as_str(), serde_json::json!({}))
            .await
    }
}
