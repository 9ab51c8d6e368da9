//! Per-provider daily usage ledger.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing;

use indexhub_core::result::AppResult;
use indexhub_core::traits::Clock;
use indexhub_database::store::{StateStore, StateStoreExt};
use indexhub_entity::state::{QUOTA_LEDGER_KEY, QuotaLedgerData, UsageBucket};

/// Answer to a daily cost threshold check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaStatus {
    /// Whether today's cost reached the limit
    pub exceeded: bool,
    /// Budget left today, never negative
    pub remaining: f64,
    /// Cost spent today
    pub spent: f64,
}

/// Upper bound on ledger history (100 years).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Accumulates `{requests, tokens, cost}` per provider per UTC day.
///
/// Updates are read-modify-write on one state record, so concurrent
/// writers can lose increments.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    state: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    retention_days: i64,
}

impl QuotaLedger {
    /// Create a ledger keeping `retention_days` of history.
    pub fn new(state: Arc<dyn StateStore>, clock: Arc<dyn Clock>, retention_days: i64) -> Self {
        Self {
            state,
            clock,
            retention_days: retention_days.clamp(1, MAX_RETENTION_DAYS),
        }
    }

    async fn load(&self) -> AppResult<QuotaLedgerData> {
        Ok(self
            .state
            .get_typed(QUOTA_LEDGER_KEY, self.clock.now())
            .await?
            .unwrap_or_default())
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Record one request against today's bucket and prune old days.
    pub async fn increment(&self, provider: &str, tokens: u64, cost: f64) -> AppResult<UsageBucket> {
        let now = self.clock.now();
        let today = now.date_naive();
        let oldest_kept = today - Duration::days(self.retention_days);

        let mut ledger = self.load().await?;
        let days = ledger.entry(provider.to_string()).or_default();
        let bucket = days.entry(today).or_default();
        bucket.requests += 1;
        bucket.tokens += tokens;
        bucket.cost += cost;
        let updated = *bucket;

        for days in ledger.values_mut() {
            days.retain(|day, _| *day >= oldest_kept);
        }
        ledger.retain(|_, days| !days.is_empty());

        self.state.put_typed(QUOTA_LEDGER_KEY, &ledger, None, now).await?;
        tracing::debug!(provider, tokens, cost, total_cost = updated.cost, "Recorded provider usage");
        Ok(updated)
    }

    /// Today's usage for `provider`.
    pub async fn usage_today(&self, provider: &str) -> AppResult<UsageBucket> {
        let today = self.today();
        Ok(self
            .load()
            .await?
            .get(provider)
            .and_then(|days| days.get(&today))
            .copied()
            .unwrap_or_default())
    }

    /// Compare today's cost for `provider` against `daily_cost_limit`.
    pub async fn threshold_exceeded(&self, provider: &str, daily_cost_limit: f64) -> AppResult<QuotaStatus> {
        let spent = self.usage_today(provider).await?.cost;
        Ok(QuotaStatus {
            exceeded: spent >= daily_cost_limit,
            remaining: (daily_cost_limit - spent).max(0.0),
            spent,
        })
    }

    /// The whole ledger.
    pub async fn snapshot(&self) -> AppResult<QuotaLedgerData> {
        self.load().await
    }
}
