//! Fixed-window rate limiter state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counter for one named action within one fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    /// Actions allowed so far in this window.
    pub count: u32,
    /// When the window opened.
    pub window_start: DateTime<Utc>,
}
