//! One-shot cooldown gate for expensive job classes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use indexhub_core::result::AppResult;
use indexhub_core::traits::Clock;
use indexhub_database::store::{StateStore, StateStoreExt};
use indexhub_entity::state::{CooldownRecord, cooldown_key};

/// Gates the start of new runs of a job class to one per cooldown period.
///
/// Advisory: it decides whether a new chain starts, never whether
/// already-queued work runs.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    state: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl CooldownGate {
    /// Create a gate with the given cooldown period.
    pub fn new(state: Arc<dyn StateStore>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            state,
            clock,
            period,
        }
    }

    /// When `class` last started a run.
    pub async fn last_run(&self, class: &str) -> AppResult<Option<DateTime<Utc>>> {
        let record: Option<CooldownRecord> = self
            .state
            .get_typed(&cooldown_key(class), self.clock.now())
            .await?;
        Ok(record.map(|r| r.last_run))
    }

    /// Whether a new run of `class` may start now.
    pub async fn allowed(&self, class: &str, force: bool) -> AppResult<bool> {
        if force {
            return Ok(true);
        }
        let now = self.clock.now();
        Ok(match self.last_run(class).await? {
            Some(last_run) => now - last_run > self.period,
            None => true,
        })
    }

    /// Record that `class` started a run now.
    pub async fn record(&self, class: &str) -> AppResult<()> {
        let now = self.clock.now();
        self.state
            .put_typed(&cooldown_key(class), &CooldownRecord { last_run: now }, None, now)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indexhub_core::traits::ManualClock;
    use indexhub_database::memory::MemoryStateStore;

    #[tokio::test]
    async fn test_gate_closes_for_the_period() {
        let clock = Arc::new(ManualClock::starting_now());
        let gate = CooldownGate::new(
            Arc::new(MemoryStateStore::new()),
            clock.clone(),
            Duration::hours(1),
        );

        assert!(gate.allowed("reindex_all", false).await.unwrap());
        gate.record("reindex_all").await.unwrap();
        assert!(!gate.allowed("reindex_all", false).await.unwrap());
        assert!(gate.allowed("reindex_all", true).await.unwrap());
        assert!(gate.allowed("other", false).await.unwrap());

        clock.advance(Duration::hours(1));
        assert!(!gate.allowed("reindex_all", false).await.unwrap());
        clock.advance(Duration::seconds(1));
        assert!(gate.allowed("reindex_all", false).await.unwrap());
    }
}
