//! Global concurrency cap.

use std::sync::Arc;

use indexhub_core::result::AppResult;

use crate::queue::JobQueue;

/// Outcome of a concurrency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyCheck {
    /// Jobs currently running
    pub running: i64,
    /// Configured cap
    pub max_concurrent: i64,
}

impl ConcurrencyCheck {
    /// Whether another cycle may start.
    pub fn allowed(&self) -> bool {
        self.running < self.max_concurrent
    }
}

/// `count(running) < max_concurrent`, checked before starting a cycle.
///
/// This is a separate read, not part of the claim, so concurrent callers
/// can overshoot the cap transiently.
#[derive(Debug, Clone)]
pub struct ConcurrencyCap {
    queue: Arc<JobQueue>,
    max_concurrent: i64,
}

impl ConcurrencyCap {
    /// Create a cap
    pub fn new(queue: Arc<JobQueue>, max_concurrent: i64) -> Self {
        Self {
            queue,
            max_concurrent,
        }
    }

    /// Count running jobs against the cap.
    pub async fn check(&self) -> AppResult<ConcurrencyCheck> {
        Ok(ConcurrencyCheck {
            running: self.queue.count_running().await?,
            max_concurrent: self.max_concurrent,
        })
    }
}
