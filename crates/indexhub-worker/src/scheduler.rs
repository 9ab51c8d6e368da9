//! Cron scheduler that triggers worker cycles and maintenance.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use indexhub_core::error::AppError;

use crate::bulk::TickOutcome;
use crate::service::WorkerService;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Cron-based scheduler for the periodic triggers
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Service the triggers call into
    service: Arc<WorkerService>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(service: Arc<WorkerService>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, service })
    }

    /// Register the worker tick, daily cleanup and bulk-indexer tick
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        let config = self.service.config();
        if !config.worker.enabled {
            tracing::warn!("Worker disabled, no scheduled tasks registered");
            return Ok(());
        }

        let worker_schedule = config.worker.schedule.clone();
        let cleanup_schedule = config.worker.cleanup_schedule.clone();
        let bulk_schedule = config.indexer.bulk_schedule.clone();

        self.register("worker_tick", &worker_schedule, |service| {
            Box::pin(async move {
                match service.run_scheduled().await {
                    Ok(Some(report)) if report.processed > 0 => {
                        tracing::debug!(processed = report.processed, "Scheduled cycle done");
                    }
                    Ok(_) => tracing::trace!("Scheduled cycle had nothing to do"),
                    Err(e) => tracing::error!(error = %e, "Scheduled worker cycle failed"),
                }
            })
        })
        .await?;

        self.register("cleanup", &cleanup_schedule, |service| {
            Box::pin(async move {
                if let Err(e) = service.enqueue_cleanup().await {
                    tracing::error!(error = %e, "Failed to enqueue cleanup");
                }
            })
        })
        .await?;

        self.register("bulk_tick", &bulk_schedule, |service| {
            Box::pin(async move {
                match service.admission().may_start_cycle().await {
                    Ok(admission) if !admission.is_allowed() => {
                        tracing::debug!(%admission, "Bulk tick deferred");
                        return;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Admission check failed for bulk tick");
                        return;
                    }
                    Ok(_) => {}
                }
                match service.bulk().tick().await {
                    Ok(TickOutcome::Idle) => tracing::trace!("Bulk indexer idle"),
                    Ok(outcome) => tracing::debug!(?outcome, "Bulk tick done"),
                    Err(e) => tracing::error!(error = %e, "Bulk tick failed"),
                }
            })
        })
        .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    async fn register<F>(&self, name: &str, schedule: &str, task: F) -> Result<(), AppError>
    where
        F: Fn(Arc<WorkerService>) -> Task + Send + Sync + 'static,
    {
        let service = Arc::clone(&self.service);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| task(Arc::clone(&service)))
            .map_err(|e| AppError::configuration(format!("Invalid schedule for {name}: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        tracing::info!(task = name, schedule, "Registered scheduled task");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
