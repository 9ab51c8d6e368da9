//! Admission control configuration.

use serde::{Deserialize, Serialize};

/// Limits consulted before new work is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum number of jobs allowed in the `running` state before new
    /// cycles are deferred.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: i64,
    /// Minimum seconds between two `reindex_all` chain starts.
    #[serde(default = "default_reindex_cooldown")]
    pub reindex_cooldown_seconds: u64,
    /// Daily spend ceiling across all embedding providers. Absent disables
    /// the quota check.
    #[serde(default)]
    pub daily_cost_limit: Option<f64>,
    /// Days of per-provider usage kept in the quota ledger.
    #[serde(default = "default_quota_retention")]
    pub quota_retention_days: i64,
    /// Manual worker runs allowed per window.
    #[serde(default = "default_manual_run_limit")]
    pub manual_run_limit: u32,
    /// Length of the manual-run rate window, in seconds.
    #[serde(default = "default_manual_run_window")]
    pub manual_run_window_seconds: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            reindex_cooldown_seconds: default_reindex_cooldown(),
            daily_cost_limit: None,
            quota_retention_days: default_quota_retention(),
            manual_run_limit: default_manual_run_limit(),
            manual_run_window_seconds: default_manual_run_window(),
        }
    }
}

fn default_max_concurrent() -> i64 {
    3
}

fn default_reindex_cooldown() -> u64 {
    3600
}

fn default_quota_retention() -> i64 {
    30
}

fn default_manual_run_limit() -> u32 {
    5
}

fn default_manual_run_window() -> u64 {
    60
}
