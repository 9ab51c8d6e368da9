//! Worker runner — one bounded drain of the queue per call.
//!
//! There is no long-lived poll loop: each cycle is started by the cron
//! trigger or an administrative call, takes the advisory lease, drains at
//! most `limit` jobs and releases the lease before returning.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing;

use indexhub_core::result::AppResult;

use crate::executor::JobExecutor;
use crate::lease::LeaseManager;
use crate::queue::JobQueue;
use crate::retry::{RetryPolicy, Settlement};

/// Failure reason for a job whose attempts were all spent by executions
/// that never settled.
pub const ABANDONED_REASON: &str = "attempts exhausted by abandoned executions";

/// Outcome of one worker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Jobs claimed and executed
    pub processed: u32,
    /// Executions that completed the job
    pub succeeded: u32,
    /// Executions that failed (requeued or dead-lettered)
    pub failed: u32,
    /// Failures that exhausted the job's attempts
    pub dead_lettered: u32,
    /// Stale claims reset to queued during the cycle
    pub reclaimed: u64,
    /// Whether the cycle got the lease at all
    pub lease_acquired: bool,
}

/// Runs worker cycles for one runner identity.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for claiming and settling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Advisory process-wide lease
    lease: LeaseManager,
    /// Failure settlement
    retry: RetryPolicy,
    /// Claims older than this are reclaimed before each claim
    stale_threshold: Duration,
    /// Worker identifier
    runner_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        lease: LeaseManager,
        retry: RetryPolicy,
        stale_threshold: Duration,
        runner_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            lease,
            retry,
            stale_threshold,
            runner_id,
        }
    }

    /// This runner's identity
    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }

    /// The lease guarding cycles
    pub fn lease(&self) -> &LeaseManager {
        &self.lease
    }

    /// Run one cycle of at most `limit` jobs.
    ///
    /// Returns a report with `lease_acquired == false` when another worker
    /// holds the lease. Store errors abort the cycle and are returned after
    /// the lease has been released.
    pub async fn run_cycle(&self, limit: u32) -> AppResult<CycleReport> {
        if !self.lease.acquire(&self.runner_id).await? {
            tracing::debug!(runner_id = %self.runner_id, "Lease unavailable, skipping cycle");
            return Ok(CycleReport::default());
        }

        tracing::info!(runner_id = %self.runner_id, limit, "Worker cycle started");

        let drained = AssertUnwindSafe(self.drain(limit)).catch_unwind().await;

        if let Err(e) = self.lease.release(&self.runner_id).await {
            tracing::error!(runner_id = %self.runner_id, error = %e, "Failed to release lease");
        }

        let report = match drained {
            Ok(result) => result?,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        tracing::info!(
            runner_id = %self.runner_id,
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            reclaimed = report.reclaimed,
            "Worker cycle finished"
        );
        Ok(report)
    }

    async fn drain(&self, limit: u32) -> AppResult<CycleReport> {
        let mut report = CycleReport {
            lease_acquired: true,
            ..CycleReport::default()
        };

        while report.processed < limit {
            report.reclaimed += self.queue.reclaim_stale(self.stale_threshold).await?;

            let Some(mut job) = self.queue.claim_next(&self.runner_id).await? else {
                break;
            };
            report.processed += 1;

            // Reclaimed after its executions kept dying with the worker.
            if job.attempts_exhausted() {
                let entry = self.queue.fail_permanently(job.id, ABANDONED_REASON).await?;
                report.failed += 1;
                report.dead_lettered += 1;
                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    attempts = job.attempts,
                    dead_letter_id = entry.id,
                    "Job abandoned by every execution, dead-lettered"
                );
                continue;
            }

            job.attempts = self.queue.record_attempt(job.id).await?;

            match self.executor.execute(&job).await {
                Ok(_) => {
                    self.queue.complete(job.id).await?;
                    report.succeeded += 1;
                    tracing::info!(job_id = job.id, job_type = %job.job_type, "Job completed successfully");
                }
                Err(e) => {
                    report.failed += 1;
                    let error = e.to_string();
                    if let Settlement::DeadLettered(_) = self.retry.settle(&self.queue, &job, &error).await? {
                        report.dead_lettered += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}
