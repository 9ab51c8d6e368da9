//! Cursor-driven bulk indexer.
//!
//! Unlike the `reindex_all` chain, the bulk walk keeps its cursor in one
//! persisted progress record and is advanced by periodic ticks. Operators
//! start, stop and resume it by flipping the record's `running` flag.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing;

use indexhub_core::error::AppError;
use indexhub_core::result::AppResult;
use indexhub_core::traits::{Clock, ContentIndexer, ContentSource};
use indexhub_database::store::{StateStore, StateStoreExt};
use indexhub_entity::state::{CursorProgress, progress_key};

/// Name of the bulk walk's progress record.
pub const BULK_PROGRESS_NAME: &str = "bulk_index";

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// No walk is running
    Idle,
    /// One batch was processed
    Advanced {
        /// Items indexed successfully
        indexed: u32,
        /// Items the indexer rejected or errored on
        failed: u32,
        /// Offset of the next batch
        offset: u64,
    },
    /// The walk reached an empty page or its `max_total`
    Finished {
        /// Items processed over the whole walk
        total_processed: u64,
    },
}

/// Control surface and tick driver for the bulk walk.
#[derive(Debug, Clone)]
pub struct BulkIndexer {
    state: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    source: Arc<dyn ContentSource>,
    indexer: Arc<dyn ContentIndexer>,
    item_types: Vec<String>,
    key: String,
}

impl BulkIndexer {
    /// Create a bulk indexer walking `item_types`.
    pub fn new(
        state: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn ContentSource>,
        indexer: Arc<dyn ContentIndexer>,
        item_types: Vec<String>,
    ) -> Self {
        Self {
            state,
            clock,
            source,
            indexer,
            item_types,
            key: progress_key(BULK_PROGRESS_NAME),
        }
    }

    async fn save(&self, progress: &CursorProgress) -> AppResult<()> {
        self.state
            .put_typed(&self.key, progress, None, self.clock.now())
            .await
    }

    /// Current progress, if a walk was ever started.
    pub async fn status(&self) -> AppResult<Option<CursorProgress>> {
        self.state.get_typed(&self.key, self.clock.now()).await
    }

    /// Start a new walk from offset zero, replacing any previous progress.
    pub async fn start(&self, batch_size: u32, max_total: Option<u64>) -> AppResult<CursorProgress> {
        if batch_size == 0 {
            return Err(AppError::validation("batch_size must be positive"));
        }
        if max_total == Some(0) {
            return Err(AppError::validation("max_total must be positive"));
        }

        let progress = CursorProgress::start(batch_size, max_total, self.item_types.clone());
        self.save(&progress).await?;
        tracing::info!(batch_size, ?max_total, "Bulk indexing started");
        Ok(progress)
    }

    /// Pause the walk. Progress is kept.
    pub async fn stop(&self) -> AppResult<CursorProgress> {
        let mut progress = self.require().await?;
        progress.running = false;
        self.save(&progress).await?;
        tracing::info!(offset = progress.offset, "Bulk indexing stopped");
        Ok(progress)
    }

    /// Continue a paused walk from its saved offset.
    pub async fn resume(&self) -> AppResult<CursorProgress> {
        let mut progress = self.require().await?;
        if progress.finished {
            return Err(AppError::conflict(
                "Bulk indexing already finished; start a new walk",
            ));
        }
        progress.running = true;
        self.save(&progress).await?;
        tracing::info!(offset = progress.offset, "Bulk indexing resumed");
        Ok(progress)
    }

    async fn require(&self) -> AppResult<CursorProgress> {
        self.status()
            .await?
            .ok_or_else(|| AppError::not_found("Bulk indexing was never started"))
    }

    fn finish(progress: &mut CursorProgress) -> TickOutcome {
        progress.running = false;
        progress.finished = true;
        tracing::info!(total_processed = progress.total_processed, "Bulk indexing finished");
        TickOutcome::Finished {
            total_processed: progress.total_processed,
        }
    }

    /// Process one batch if a walk is running.
    pub async fn tick(&self) -> AppResult<TickOutcome> {
        let Some(mut progress) = self.status().await? else {
            return Ok(TickOutcome::Idle);
        };
        if !progress.running {
            return Ok(TickOutcome::Idle);
        }

        if progress.reached_max() {
            let outcome = Self::finish(&mut progress);
            self.save(&progress).await?;
            return Ok(outcome);
        }

        let page = self
            .source
            .fetch_page(&progress.item_types, progress.offset, progress.next_batch_len())
            .await?;
        progress.last_run = Some(self.clock.now());

        if page.is_empty() {
            let outcome = Self::finish(&mut progress);
            self.save(&progress).await?;
            return Ok(outcome);
        }

        let mut indexed = 0u32;
        let mut failed = 0u32;
        for item in &page {
            match self.indexer.embed(item.id).await {
                Ok(true) => indexed += 1,
                Ok(false) => {
                    failed += 1;
                    tracing::warn!(item_id = item.id, "Indexer rejected item during bulk walk");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(item_id = item.id, error = %e, "Indexing failed during bulk walk");
                }
            }
        }

        progress.offset += page.len() as u64;
        progress.total_processed += page.len() as u64;

        let outcome = if progress.reached_max() {
            Self::finish(&mut progress)
        } else {
            TickOutcome::Advanced {
                indexed,
                failed,
                offset: progress.offset,
            }
        };
        self.save(&progress).await?;

        tracing::debug!(
            indexed,
            failed,
            offset = progress.offset,
            total_processed = progress.total_processed,
            "Bulk batch processed"
        );
        Ok(outcome)
    }
}
