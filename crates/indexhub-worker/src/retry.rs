//! Retry and dead-letter policy.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing;

use indexhub_core::config::{BackoffConfig, seconds_setting};
use indexhub_core::result::AppResult;
use indexhub_entity::dead_letter::DeadLetter;
use indexhub_entity::job::Job;

use crate::queue::JobQueue;

/// Shortest delay ever scheduled for a retry.
const MIN_BACKOFF_MS: i64 = 1_000;

/// Largest exponent applied to the base delay.
const MAX_EXPONENT: u32 = 20;

/// What happened to a failed job.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// Returned to the queue, claimable again at `run_after`.
    Requeued {
        /// Earliest next claim time
        run_after: DateTime<Utc>,
    },
    /// Attempts exhausted; the job is terminally failed.
    DeadLettered(DeadLetter),
}

/// Decides between requeue-with-backoff and dead-lettering.
///
/// Delay for attempt `n` is `min(base * 2^(n-1), max)` plus up to 10%
/// jitter, never below one second.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay after the first failure
    base: Duration,
    /// Upper bound before jitter
    max: Duration,
    /// Whether to add random jitter
    jitter: bool,
}

impl RetryPolicy {
    /// Create a retry policy
    pub fn new(base: Duration, max: Duration, jitter: bool) -> Self {
        Self { base, max, jitter }
    }

    /// Create a retry policy from configuration
    pub fn from_config(config: &BackoffConfig) -> AppResult<Self> {
        Ok(Self::new(
            seconds_setting("worker.backoff.base_seconds", config.base_seconds)?,
            seconds_setting("worker.backoff.max_seconds", config.max_seconds)?,
            config.jitter,
        ))
    }

    /// Delay before the next attempt, given the attempts made so far.
    pub fn backoff(&self, attempts: i32) -> Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, MAX_EXPONENT as i32) as u32;
        let base_ms = self.base.num_milliseconds().max(0);
        let max_ms = self.max.num_milliseconds().max(0);

        let mut delay_ms = base_ms.saturating_mul(1_i64 << exponent).min(max_ms);
        if self.jitter && delay_ms >= 10 {
            delay_ms += rand::thread_rng().gen_range(0..=delay_ms / 10);
        }

        Duration::milliseconds(delay_ms.max(MIN_BACKOFF_MS))
    }

    /// Settle a failed execution of `job`.
    ///
    /// `job.attempts` must already count this execution.
    pub async fn settle(&self, queue: &JobQueue, job: &Job, error: &str) -> AppResult<Settlement> {
        if job.attempts_exhausted() {
            let entry = queue.fail_permanently(job.id, error).await?;
            tracing::error!(
                job_id = job.id,
                job_type = %job.job_type,
                attempts = job.attempts,
                dead_letter_id = entry.id,
                error,
                "Job failed permanently, dead-lettered"
            );
            return Ok(Settlement::DeadLettered(entry));
        }

        let run_after = queue.clock().now() + self.backoff(job.attempts);
        queue.requeue(job.id, error, run_after).await?;
        tracing::warn!(
            job_id = job.id,
            job_type = %job.job_type,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            %run_after,
            error,
            "Job failed, requeued with backoff"
        );
        Ok(Settlement::Requeued { run_after })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(30), Duration::seconds(3600), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::seconds(30), Duration::seconds(3600), false)
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::seconds(30));
        assert_eq!(policy.backoff(2), Duration::seconds(60));
        assert_eq!(policy.backoff(3), Duration::seconds(120));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = policy();
        assert_eq!(policy.backoff(10), Duration::seconds(3600));
        assert_eq!(policy.backoff(i32::MAX), Duration::seconds(3600));
    }

    #[test]
    fn test_backoff_never_below_one_second() {
        let policy = RetryPolicy::new(Duration::zero(), Duration::zero(), true);
        assert_eq!(policy.backoff(1), Duration::seconds(1));
        assert_eq!(policy.backoff(0), Duration::seconds(1));
    }

    #[test]
    fn test_from_config_rejects_oversized_delays() {
        let config = BackoffConfig {
            base_seconds: 30,
            max_seconds: u64::MAX,
            jitter: false,
        };
        let err = RetryPolicy::from_config(&config).unwrap_err();
        assert_eq!(err.kind, indexhub_core::error::ErrorKind::Configuration);

        let policy = RetryPolicy::from_config(&BackoffConfig {
            jitter: false,
            ..BackoffConfig::default()
        })
        .unwrap();
        assert_eq!(policy.backoff(1), Duration::seconds(30));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::new(Duration::seconds(100), Duration::seconds(1000), true);
        for _ in 0..100 {
            let delay = policy.backoff(1);
            assert!(delay >= Duration::seconds(100));
            assert!(delay <= Duration::seconds(110));
        }
    }
}
