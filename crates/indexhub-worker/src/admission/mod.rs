//! Admission control: checks that decide whether new work should start.
//!
//! None of these checks are transactional with the claim. They reduce
//! contention and duplicate work; they do not guarantee correctness.

pub mod concurrency;
pub mod cooldown;
pub mod quota;
pub mod rate_limit;

use std::fmt;

use tracing;

use indexhub_core::result::AppResult;

pub use concurrency::{ConcurrencyCap, ConcurrencyCheck};
pub use cooldown::CooldownGate;
pub use quota::{QuotaLedger, QuotaStatus};
pub use rate_limit::RateLimiter;

/// Decision on starting a worker cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Go ahead
    Allowed,
    /// Too many jobs are running
    ConcurrencyLimitReached {
        /// Jobs currently running
        running: i64,
        /// Configured cap
        max_concurrent: i64,
    },
    /// The provider's daily budget is spent
    QuotaExceeded {
        /// Cost spent today
        spent: f64,
        /// Daily limit
        limit: f64,
    },
}

impl Admission {
    /// Whether the cycle may start.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::ConcurrencyLimitReached {
                running,
                max_concurrent,
            } => write!(f, "concurrency limit reached ({running}/{max_concurrent} running)"),
            Self::QuotaExceeded { spent, limit } => {
                write!(f, "daily quota exceeded ({spent:.2}/{limit:.2})")
            }
        }
    }
}

/// Combines the concurrency cap and the quota ledger.
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    concurrency: ConcurrencyCap,
    quota: QuotaLedger,
    provider: String,
    daily_cost_limit: Option<f64>,
}

impl AdmissionControl {
    /// Create the admission facade. Without a `daily_cost_limit` the quota
    /// is never consulted.
    pub fn new(
        concurrency: ConcurrencyCap,
        quota: QuotaLedger,
        provider: impl Into<String>,
        daily_cost_limit: Option<f64>,
    ) -> Self {
        Self {
            concurrency,
            quota,
            provider: provider.into(),
            daily_cost_limit,
        }
    }

    /// The quota ledger
    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    /// Decide whether a new worker cycle should start.
    pub async fn may_start_cycle(&self) -> AppResult<Admission> {
        let check = self.concurrency.check().await?;
        if !check.allowed() {
            tracing::debug!(
                running = check.running,
                max_concurrent = check.max_concurrent,
                "Concurrency cap reached, deferring cycle"
            );
            return Ok(Admission::ConcurrencyLimitReached {
                running: check.running,
                max_concurrent: check.max_concurrent,
            });
        }

        if let Some(limit) = self.daily_cost_limit {
            let status = self.quota.threshold_exceeded(&self.provider, limit).await?;
            if status.exceeded {
                tracing::info!(
                    provider = %self.provider,
                    spent = status.spent,
                    limit,
                    "Daily quota exceeded, deferring cycle"
                );
                return Ok(Admission::QuotaExceeded {
                    spent: status.spent,
                    limit,
                });
            }
        }

        Ok(Admission::Allowed)
    }
}
