//! Keyed worker state repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use indexhub_core::error::{AppError, ErrorKind};
use indexhub_core::result::AppResult;

use crate::store::StateStore;

/// Repository for the `worker_state` table.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Create a new state repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> AppResult<Option<Value>> {
        sqlx::query_scalar::<_, Value>(
            "SELECT value FROM worker_state \
             WHERE key = $1 AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read worker state", e))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO worker_state (key, value, expires_at, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (key) DO UPDATE \
             SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write worker state", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM worker_state WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete worker state", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
