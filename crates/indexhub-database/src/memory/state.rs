//! In-memory keyed state store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use indexhub_core::result::AppResult;

use crate::store::StateStore;

/// A stored record and its optional expiry.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory state store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> AppResult<Option<Value>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= now),
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        expires_at: Option<DateTime<Utc>>,
        _now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.entries.lock().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStoreExt;
    use chrono::Duration;
    use indexhub_entity::state::CooldownRecord;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStateStore::new();
        let now = Utc::now();
        store.put("k", json!({"a": 1}), None, now).await.unwrap();
        assert_eq!(store.get("k", now).await.unwrap(), Some(json!({"a": 1})));
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.get("k", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent() {
        let store = MemoryStateStore::new();
        let now = Utc::now();
        let expires = now + Duration::seconds(10);
        store.put("k", json!(1), Some(expires), now).await.unwrap();
        assert!(store.get("k", now).await.unwrap().is_some());
        assert!(store.get("k", expires).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let store = MemoryStateStore::new();
        let now = Utc::now();
        let record = CooldownRecord { last_run: now };
        store
            .put_typed("cooldown:reindex_all", &record, None, now)
            .await
            .unwrap();
        let loaded: Option<CooldownRecord> =
            store.get_typed("cooldown:reindex_all", now).await.unwrap();
        assert_eq!(loaded, Some(record));
    }
}
