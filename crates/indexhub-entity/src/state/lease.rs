//! Advisory worker lease.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time-bounded advisory ownership of the worker loop.
///
/// Staleness is purely time-based: a lease older than its TTL may be
/// taken over without the holder's cooperation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLease {
    /// Identity of the worker instance holding the lease.
    pub holder_id: String,
    /// When the lease was taken.
    pub acquired_at: DateTime<Utc>,
}

impl WorkerLease {
    /// Check whether the lease has outlived `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.acquired_at >= ttl
    }
}
