//! Content source backed by the host CMS's `indexable_content` view.

use async_trait::async_trait;
use sqlx::PgPool;

use indexhub_core::error::{AppError, ErrorKind};
use indexhub_core::result::AppResult;
use indexhub_core::traits::ContentSource;
use indexhub_core::types::ContentItem;

/// Pages over `indexable_content (id, item_type)` ordered by id.
///
/// This is a live query: items inserted behind a walk's cursor are not
/// revisited by that walk.
#[derive(Debug, Clone)]
pub struct PgContentSource {
    pool: PgPool,
}

impl PgContentSource {
    /// Create a new content source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: i64,
    item_type: String,
}

#[async_trait]
impl ContentSource for PgContentSource {
    async fn fetch_page(
        &self,
        item_types: &[String],
        offset: u64,
        limit: u32,
    ) -> AppResult<Vec<ContentItem>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            "SELECT id, item_type FROM indexable_content \
             WHERE cardinality($1::text[]) = 0 OR item_type = ANY($1) \
             ORDER BY id ASC LIMIT $2 OFFSET $3",
        )
        .bind(item_types)
        .bind(i64::from(limit))
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to page content", e))?;

        Ok(rows
            .into_iter()
            .map(|row| ContentItem::new(row.id, row.item_type))
            .collect())
    }

    async fn exists(&self, item_id: i64) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM indexable_content WHERE id = $1)")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check content", e))
    }
}
