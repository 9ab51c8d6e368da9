//! Cooldown and cursor progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-shot cooldown state for an expensive job class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    /// When the class last started a run.
    pub last_run: DateTime<Utc>,
}

/// Progress of a long-lived cursor walk driven by periodic ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorProgress {
    /// Whether ticks should advance the walk.
    pub running: bool,
    /// Offset of the next page.
    pub offset: u64,
    /// Items per page.
    pub batch_size: u32,
    /// Items processed since the walk started.
    pub total_processed: u64,
    /// Stop after this many items.
    pub max_total: Option<u64>,
    /// Content item types walked.
    #[serde(default)]
    pub item_types: Vec<String>,
    /// When the last batch ran.
    pub last_run: Option<DateTime<Utc>>,
    /// Whether the walk reached its end (empty page or `max_total`).
    #[serde(default)]
    pub finished: bool,
}

impl CursorProgress {
    /// A fresh walk from offset zero.
    pub fn start(batch_size: u32, max_total: Option<u64>, item_types: Vec<String>) -> Self {
        Self {
            running: true,
            offset: 0,
            batch_size,
            total_processed: 0,
            max_total,
            item_types,
            last_run: None,
            finished: false,
        }
    }

    /// Check whether `max_total` has been reached.
    pub fn reached_max(&self) -> bool {
        self.max_total.is_some_and(|max| self.total_processed >= max)
    }

    /// Items the next batch may process without exceeding `max_total`.
    pub fn next_batch_len(&self) -> u32 {
        match self.max_total {
            Some(max) => {
                let remaining = max.saturating_sub(self.total_processed);
                remaining.min(u64::from(self.batch_size)) as u32
            }
            None => self.batch_size,
        }
    }
}
