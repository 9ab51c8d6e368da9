//! Fixed-window rate limiter keyed by action name.

use std::sync::Arc;

use chrono::Duration;
use tracing;

use indexhub_core::result::AppResult;
use indexhub_core::traits::Clock;
use indexhub_database::store::{StateStore, StateStoreExt};
use indexhub_entity::state::{RateWindow, rate_key};

/// Counts actions per fixed window in the state store.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter
    pub fn new(state: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    /// Check `action` against `limit` per `window`, consuming one slot when allowed.
    ///
    /// A missing or elapsed window is replaced by a new one starting now.
    pub async fn check(&self, action: &str, limit: u32, window: Duration) -> AppResult<bool> {
        let now = self.clock.now();
        let key = rate_key(action);

        let current: Option<RateWindow> = self.state.get_typed(&key, now).await?;
        let mut entry = match current {
            Some(entry) if now - entry.window_start < window => entry,
            _ => RateWindow {
                count: 0,
                window_start: now,
            },
        };

        if entry.count >= limit {
            tracing::debug!(action, limit, count = entry.count, "Rate limit reached");
            return Ok(false);
        }

        entry.count += 1;
        let expires_at = entry.window_start + window;
        self.state.put_typed(&key, &entry, Some(expires_at), now).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indexhub_core::traits::ManualClock;
    use indexhub_database::memory::MemoryStateStore;

    #[tokio::test]
    async fn test_window_limits_and_resets() {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = RateLimiter::new(Arc::new(MemoryStateStore::new()), clock.clone());
        let window = Duration::seconds(60);

        assert!(limiter.check("worker.manual_run", 2, window).await.unwrap());
        assert!(limiter.check("worker.manual_run", 2, window).await.unwrap());
        assert!(!limiter.check("worker.manual_run", 2, window).await.unwrap());
        assert!(limiter.check("other", 2, window).await.unwrap());

        clock.advance(Duration::seconds(60));
        assert!(limiter.check("worker.manual_run", 2, window).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_limit_denies() {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = RateLimiter::new(Arc::new(MemoryStateStore::new()), clock);
        assert!(!limiter.check("x", 0, Duration::seconds(1)).await.unwrap());
    }
}
