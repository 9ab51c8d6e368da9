//! Typed job payload definitions.

use serde::{Deserialize, Serialize};

/// Payload for jobs that target a single content item
/// (`embed_content`, `reindex_item`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Content item identifier.
    pub item_id: i64,
}

/// Payload for the `reindex_all` batch walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexAllPayload {
    /// Content item types to walk.
    #[serde(default)]
    pub item_types: Vec<String>,
    /// Items per page.
    pub batch_size: u32,
    /// Offset of the page this invocation processes.
    #[serde(default)]
    pub offset: u64,
    /// Skip the cooldown gate.
    #[serde(default)]
    pub force: bool,
}

impl ReindexAllPayload {
    /// The payload for the next page of the same chain.
    pub fn continuation(&self) -> Self {
        Self {
            item_types: self.item_types.clone(),
            batch_size: self.batch_size,
            offset: self.offset + u64::from(self.batch_size),
            force: self.force,
        }
    }
}

/// Payload for the `cleanup` job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPayload {
    /// Override for the configured job retention window.
    #[serde(default)]
    pub retention_days: Option<u32>,
}
