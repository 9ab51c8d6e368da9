//! External content collaborators.
//!
//! Chunking, embedding, and storage of vectors live outside the queue.
//! Job handlers only see these two seams.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::content::ContentItem;

/// Read access to the content items that can be indexed.
#[async_trait]
pub trait ContentSource: Send + Sync + std::fmt::Debug + 'static {
    /// Return up to `limit` items of the given types starting at `offset`,
    /// ordered by identifier ascending.
    async fn fetch_page(
        &self,
        item_types: &[String],
        offset: u64,
        limit: u32,
    ) -> AppResult<Vec<ContentItem>>;

    /// Check whether an item still exists.
    async fn exists(&self, item_id: i64) -> AppResult<bool>;
}

/// The indexing pipeline a handler delegates to.
///
/// Both operations report success as a boolean; `Ok(false)` means the
/// pipeline declined or failed softly and the job should be retried.
#[async_trait]
pub trait ContentIndexer: Send + Sync + std::fmt::Debug + 'static {
    /// Generate and store embeddings for a content item.
    async fn embed(&self, item_id: i64) -> AppResult<bool>;

    /// Drop existing chunks for an item and index it again.
    async fn reindex(&self, item_id: i64) -> AppResult<bool>;
}
