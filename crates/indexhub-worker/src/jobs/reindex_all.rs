//! The `reindex_all` batch walk.
//!
//! Each invocation handles one page and enqueues its own continuation,
//! so a full walk is a chain of jobs rather than one long execution.
//! The page is a live query over `ORDER BY id`: items inserted behind the
//! cursor while a chain runs are left for the next chain.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use indexhub_core::traits::ContentSource;
use indexhub_entity::job::{ItemPayload, Job, JobKind, ReindexAllPayload};

use crate::admission::CooldownGate;
use crate::executor::{JobExecutionError, JobHandler, parse_payload};
use crate::queue::JobQueue;

/// Cooldown class of the batch walk.
pub const REINDEX_ALL_COOLDOWN: &str = "reindex_all";

/// Walks all indexable content one page per job.
#[derive(Debug)]
pub struct ReindexAllHandler {
    queue: Arc<JobQueue>,
    source: Arc<dyn ContentSource>,
    cooldown: CooldownGate,
}

impl ReindexAllHandler {
    /// Create the batch-walk handler
    pub fn new(queue: Arc<JobQueue>, source: Arc<dyn ContentSource>, cooldown: CooldownGate) -> Self {
        Self {
            queue,
            source,
            cooldown,
        }
    }
}

#[async_trait]
impl JobHandler for ReindexAllHandler {
    fn job_type(&self) -> &str {
        JobKind::ReindexAll.as_str()
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: ReindexAllPayload = parse_payload(job)?;
        if payload.batch_size == 0 {
            return Err(JobExecutionError::MalformedPayload(
                "batch_size must be positive".to_string(),
            ));
        }

        let chain_start = payload.offset == 0;

        // Continuations are already-queued work and are never gated.
        if chain_start && !self.cooldown.allowed(REINDEX_ALL_COOLDOWN, payload.force).await? {
            tracing::debug!(job_id = job.id, "Reindex cooldown active, skipping chain");
            return Ok(Some(serde_json::json!({ "skipped": "cooldown" })));
        }

        let page = self
            .source
            .fetch_page(&payload.item_types, payload.offset, payload.batch_size)
            .await?;

        if page.is_empty() {
            if chain_start {
                self.cooldown.record(REINDEX_ALL_COOLDOWN).await?;
            }
            tracing::info!(job_id = job.id, offset = payload.offset, "Reindex chain finished");
            return Ok(Some(serde_json::json!({
                "offset": payload.offset,
                "enqueued": 0,
                "finished": true,
            })));
        }

        let mut enqueued = 0u64;
        for item in &page {
            let child = serde_json::to_value(ItemPayload { item_id: item.id })
                .map_err(indexhub_core::AppError::from)?;
            self.queue.enqueue(JobKind::ReindexItem.as_str(), child).await?;
            enqueued += 1;
        }

        let next = payload.continuation();
        let next_offset = next.offset;
        let continuation = serde_json::to_value(next).map_err(indexhub_core::AppError::from)?;
        let continuation_id = self
            .queue
            .enqueue(JobKind::ReindexAll.as_str(), continuation)
            .await?;

        if chain_start {
            self.cooldown.record(REINDEX_ALL_COOLDOWN).await?;
            tracing::info!(
                job_id = job.id,
                item_types = ?payload.item_types,
                batch_size = payload.batch_size,
                force = payload.force,
                "Reindex chain started"
            );
        }

        tracing::debug!(
            job_id = job.id,
            offset = payload.offset,
            enqueued,
            continuation_id,
            next_offset,
            "Reindex page processed"
        );

        Ok(Some(serde_json::json!({
            "offset": payload.offset,
            "enqueued": enqueued,
            "next_offset": next_offset,
            "continuation_id": continuation_id,
        })))
    }
}
