//! Single-item indexing handlers (`embed_content`, `reindex_item`).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use indexhub_core::traits::ContentIndexer;
use indexhub_entity::job::{ItemPayload, Job, JobKind};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};

/// Delegates one content item to the indexing collaborator.
#[derive(Debug)]
pub struct ItemIndexHandler {
    /// Either `EmbedContent` or `ReindexItem`
    kind: JobKind,
    /// External indexing service
    indexer: Arc<dyn ContentIndexer>,
}

impl ItemIndexHandler {
    /// Handler for `embed_content` jobs
    pub fn embed(indexer: Arc<dyn ContentIndexer>) -> Self {
        Self {
            kind: JobKind::EmbedContent,
            indexer,
        }
    }

    /// Handler for `reindex_item` jobs
    pub fn reindex(indexer: Arc<dyn ContentIndexer>) -> Self {
        Self {
            kind: JobKind::ReindexItem,
            indexer,
        }
    }
}

#[async_trait]
impl JobHandler for ItemIndexHandler {
    fn job_type(&self) -> &str {
        self.kind.as_str()
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: ItemPayload = parse_payload(job)?;
        if payload.item_id <= 0 {
            return Err(JobExecutionError::MalformedPayload(format!(
                "invalid item id {}",
                payload.item_id
            )));
        }

        let indexed = match self.kind {
            JobKind::ReindexItem => self.indexer.reindex(payload.item_id).await?,
            _ => self.indexer.embed(payload.item_id).await?,
        };

        if !indexed {
            return Err(JobExecutionError::Failed(format!(
                "indexer rejected item {}",
                payload.item_id
            )));
        }

        tracing::debug!(job_id = job.id, item_id = payload.item_id, job_type = %self.kind, "Item indexed");
        Ok(Some(serde_json::json!({ "item_id": payload.item_id })))
    }
}
