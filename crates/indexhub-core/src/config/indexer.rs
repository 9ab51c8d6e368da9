//! External indexing service configuration.

use serde::{Deserialize, Serialize};

/// Settings for the indexing service the job handlers delegate to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Base URL of the indexing service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Provider name recorded in the quota ledger.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Content item types walked by `reindex_all` and the bulk indexer.
    #[serde(default = "default_item_types")]
    pub item_types: Vec<String>,
    /// Page size for `reindex_all` chains and bulk batches.
    #[serde(default = "default_batch_size")]
    pub bulk_batch_size: u32,
    /// Cron expression for the bulk indexer tick.
    #[serde(default = "default_bulk_schedule")]
    pub bulk_schedule: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            provider: default_provider(),
            timeout_seconds: default_timeout(),
            item_types: default_item_types(),
            bulk_batch_size: default_batch_size(),
            bulk_schedule: default_bulk_schedule(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8700".to_string()
}

fn default_provider() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_item_types() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}

fn default_batch_size() -> u32 {
    50
}

fn default_bulk_schedule() -> String {
    "0 */5 * * * *".to_string()
}
