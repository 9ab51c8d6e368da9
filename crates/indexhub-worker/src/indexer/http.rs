//! HTTP client for the external indexing service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing;

use indexhub_core::config::IndexerConfig;
use indexhub_core::error::{AppError, ErrorKind};
use indexhub_core::result::AppResult;
use indexhub_core::traits::ContentIndexer;

use crate::admission::QuotaLedger;

/// Usage reported by the indexing service for one call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    tokens: u64,
    #[serde(default)]
    cost: f64,
}

/// Response body of the item endpoints.
#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    usage: Option<Usage>,
}

fn default_success() -> bool {
    true
}

/// Posts items to `{endpoint}/items/{id}/embed` and `{endpoint}/items/{id}/reindex`.
///
/// A `404` means the item no longer exists and is reported as an
/// unsuccessful outcome. Other non-success statuses are errors.
#[derive(Debug, Clone)]
pub struct HttpContentIndexer {
    client: reqwest::Client,
    endpoint: String,
    provider: String,
    quota: Option<Arc<QuotaLedger>>,
}

impl HttpContentIndexer {
    /// Create an indexer client from configuration.
    pub fn new(config: &IndexerConfig, quota: Option<Arc<QuotaLedger>>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            provider: config.provider.clone(),
            quota,
        })
    }

    fn url(&self, item_id: i64, operation: &str) -> String {
        format!("{}/items/{item_id}/{operation}", self.endpoint)
    }

    async fn call(&self, item_id: i64, operation: &str) -> AppResult<bool> {
        let url = self.url(item_id, operation);
        let response = self.client.post(&url).send().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("Indexing request to {url} failed"),
                e,
            )
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(item_id, operation, "Indexing service does not know the item");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(AppError::external(format!(
                "Indexing service returned {status} for item {item_id}"
            )));
        }

        let body: IndexResponse = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::ExternalService,
                "Invalid response from indexing service",
                e,
            )
        })?;

        if let (Some(usage), Some(quota)) = (body.usage, &self.quota) {
            quota.increment(&self.provider, usage.tokens, usage.cost).await?;
        }

        Ok(body.success)
    }
}

#[async_trait]
impl ContentIndexer for HttpContentIndexer {
    async fn embed(&self, item_id: i64) -> AppResult<bool> {
        self.call(item_id, "embed").await
    }

    async fn reindex(&self, item_id: i64) -> AppResult<bool> {
        self.call(item_id, "reindex").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let config = IndexerConfig {
            endpoint: "http://indexer.local/".to_string(),
            ..IndexerConfig::default()
        };
        let indexer = HttpContentIndexer::new(&config, None).unwrap();
        assert_eq!(indexer.url(7, "embed"), "http://indexer.local/items/7/embed");
    }

    #[test]
    fn test_response_defaults_to_success() {
        let body: IndexResponse = serde_json::from_str(r#"{"usage": {"tokens": 12}}"#).unwrap();
        assert!(body.success);
        assert_eq!(body.usage.unwrap().tokens, 12);
    }
}
