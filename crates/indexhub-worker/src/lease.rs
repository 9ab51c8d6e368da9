//! Advisory worker lease.
//!
//! Acquisition is read-then-write, so two workers racing on an expired
//! lease can both believe they hold it. Per-job safety comes from the
//! atomic claim, not from this lease.

use std::sync::Arc;

use chrono::Duration;
use tracing;

use indexhub_core::result::AppResult;
use indexhub_core::traits::Clock;
use indexhub_database::store::{StateStore, StateStoreExt};
use indexhub_entity::state::{WorkerLease, lease_key};

/// Manages one named advisory lease in the state store.
#[derive(Debug, Clone)]
pub struct LeaseManager {
    /// Keyed state persistence
    state: Arc<dyn StateStore>,
    /// Time source
    clock: Arc<dyn Clock>,
    /// State key of the lease
    key: String,
    /// Age after which a held lease may be taken over
    ttl: Duration,
}

impl LeaseManager {
    /// Create a lease manager for the lease called `name`.
    pub fn new(state: Arc<dyn StateStore>, clock: Arc<dyn Clock>, name: &str, ttl: Duration) -> Self {
        Self {
            state,
            clock,
            key: lease_key(name),
            ttl,
        }
    }

    /// The lease currently on record, expired or not.
    pub async fn current(&self) -> AppResult<Option<WorkerLease>> {
        self.state.get_typed(&self.key, self.clock.now()).await
    }

    /// Try to take the lease for `holder_id`.
    ///
    /// Succeeds when no lease is recorded or the recorded one has outlived
    /// its TTL. Returns `false` when another holder's lease is still fresh.
    pub async fn acquire(&self, holder_id: &str) -> AppResult<bool> {
        let now = self.clock.now();

        if let Some(existing) = self.current().await? {
            if !existing.is_expired(now, self.ttl) {
                tracing::debug!(
                    holder = %existing.holder_id,
                    requested_by = holder_id,
                    "Lease held by another worker"
                );
                return Ok(false);
            }
            tracing::warn!(
                previous_holder = %existing.holder_id,
                holder = holder_id,
                "Taking over expired lease"
            );
        }

        let lease = WorkerLease {
            holder_id: holder_id.to_string(),
            acquired_at: now,
        };
        self.state.put_typed(&self.key, &lease, None, now).await?;
        Ok(true)
    }

    /// Release the lease if `holder_id` still holds it.
    ///
    /// Returns `false` when the lease was already gone or taken over.
    pub async fn release(&self, holder_id: &str) -> AppResult<bool> {
        match self.current().await? {
            Some(lease) if lease.holder_id == holder_id => self.state.delete(&self.key).await,
            Some(lease) => {
                tracing::warn!(
                    holder = %lease.holder_id,
                    released_by = holder_id,
                    "Lease was taken over before release"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indexhub_core::traits::ManualClock;
    use indexhub_database::memory::MemoryStateStore;

    fn manager() -> (LeaseManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let manager = LeaseManager::new(
            Arc::new(MemoryStateStore::new()),
            clock.clone(),
            "index_worker",
            Duration::seconds(60),
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn test_fresh_lease_blocks_other_holders() {
        let (lease, clock) = manager();
        assert!(lease.acquire("a").await.unwrap());
        clock.advance(Duration::seconds(59));
        assert!(!lease.acquire("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_is_taken_over() {
        let (lease, clock) = manager();
        assert!(lease.acquire("a").await.unwrap());
        clock.advance(Duration::seconds(60));
        assert!(lease.acquire("b").await.unwrap());
        assert_eq!(lease.current().await.unwrap().unwrap().holder_id, "b");
    }

    #[tokio::test]
    async fn test_release_only_by_holder() {
        let (lease, clock) = manager();
        assert!(lease.acquire("a").await.unwrap());
        clock.advance(Duration::seconds(61));
        assert!(lease.acquire("b").await.unwrap());

        assert!(!lease.release("a").await.unwrap());
        assert!(lease.release("b").await.unwrap());
        assert!(lease.current().await.unwrap().is_none());
        assert!(lease.acquire("a").await.unwrap());
    }
}
