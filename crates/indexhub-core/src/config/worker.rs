//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the scheduled worker tick is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for the scheduled worker tick.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Maximum jobs drained by one scheduled cycle.
    #[serde(default = "default_scheduled_limit")]
    pub scheduled_batch_limit: u32,
    /// Maximum jobs drained by one manual/administrative cycle.
    #[serde(default = "default_manual_limit")]
    pub manual_batch_limit: u32,
    /// Name of the advisory lease record.
    #[serde(default = "default_lease_name")]
    pub lease_name: String,
    /// Seconds after which a held lease is considered abandoned.
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_seconds: u64,
    /// Seconds after which a locked job is considered crashed and reclaimed.
    /// Must comfortably exceed the longest single-job execution time.
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_seconds: u64,
    /// Attempts allowed before a job is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
    /// Cron expression for the periodic cleanup enqueue.
    #[serde(default = "default_cleanup_schedule")]
    pub cleanup_schedule: String,
    /// Terminal jobs older than this are deleted by the cleanup job.
    #[serde(default = "default_retention_days")]
    pub cleanup_retention_days: u32,
    /// Dead letters older than this are purged by the cleanup job.
    /// Absent means dead letters are kept indefinitely.
    #[serde(default)]
    pub dead_letter_retention_days: Option<u32>,
    /// Retry backoff settings.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_schedule(),
            scheduled_batch_limit: default_scheduled_limit(),
            manual_batch_limit: default_manual_limit(),
            lease_name: default_lease_name(),
            lease_ttl_seconds: default_lease_ttl(),
            stale_threshold_seconds: default_stale_threshold(),
            default_max_attempts: default_max_attempts(),
            cleanup_schedule: default_cleanup_schedule(),
            cleanup_retention_days: default_retention_days(),
            dead_letter_retention_days: None,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential retry backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry, in seconds.
    #[serde(default = "default_backoff_base")]
    pub base_seconds: u64,
    /// Upper bound on the delay, in seconds.
    #[serde(default = "default_backoff_max")]
    pub max_seconds: u64,
    /// Whether to add up to 10% random jitter.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_seconds: default_backoff_base(),
            max_seconds: default_backoff_max(),
            jitter: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 * * * * *".to_string()
}

fn default_scheduled_limit() -> u32 {
    3
}

fn default_manual_limit() -> u32 {
    10
}

fn default_lease_name() -> String {
    "index_worker".to_string()
}

fn default_lease_ttl() -> u64 {
    60
}

fn default_stale_threshold() -> u64 {
    600
}

fn default_max_attempts() -> i32 {
    5
}

fn default_cleanup_schedule() -> String {
    "0 30 3 * * *".to_string()
}

fn default_retention_days() -> u32 {
    7
}

fn default_backoff_base() -> u64 {
    30
}

fn default_backoff_max() -> u64 {
    3600
}
