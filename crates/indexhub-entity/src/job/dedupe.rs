//! Deduplication key derivation.

use serde_json::Value;

use super::kind::JobKind;

/// The dedupe key and target reference derived from a job's type and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeKey {
    /// Key that at most one pending job may hold at a time.
    pub key: String,
    /// Content item the job targets, if any.
    pub target_id: Option<i64>,
}

/// Derive the dedupe key for a job.
///
/// Item jobs dedupe per item. `reindex_all` includes the page offset so a
/// chain's continuation never collides with the still-running parent.
/// Unknown types fall back to the canonical payload JSON.
pub fn derive_dedupe_key(job_type: &str, payload: &Value) -> DedupeKey {
    let target_id = payload.get("item_id").and_then(Value::as_i64);

    let key = match (job_type.parse::<JobKind>(), target_id) {
        (Ok(JobKind::EmbedContent | JobKind::ReindexItem), Some(id)) => {
            format!("{job_type}:item:{id}")
        }
        (Ok(JobKind::ReindexAll), _) => {
            let offset = payload.get("offset").and_then(Value::as_u64).unwrap_or(0);
            let types = payload
                .get("item_types")
                .and_then(Value::as_array)
                .map(|types| {
                    let mut names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                    names.sort_unstable();
                    names.join(",")
                })
                .unwrap_or_default();
            format!("{job_type}:{types}:offset:{offset}")
        }
        (Ok(JobKind::Cleanup), _) => job_type.to_string(),
        _ => format!("{job_type}:{payload}"),
    };

    DedupeKey { key, target_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_jobs_dedupe_per_item() {
        let a = derive_dedupe_key("embed_content", &json!({"item_id": 42}));
        let b = derive_dedupe_key("embed_content", &json!({"item_id": 42, "extra": true}));
        assert_eq!(a, b);
        assert_eq!(a.key, "embed_content:item:42");
        assert_eq!(a.target_id, Some(42));

        let other_type = derive_dedupe_key("reindex_item", &json!({"item_id": 42}));
        assert_ne!(a.key, other_type.key);
    }

    #[test]
    fn test_reindex_all_includes_offset() {
        let first = derive_dedupe_key(
            "reindex_all",
            &json!({"item_types": ["post", "page"], "batch_size": 2, "offset": 0}),
        );
        let next = derive_dedupe_key(
            "reindex_all",
            &json!({"item_types": ["page", "post"], "batch_size": 2, "offset": 2}),
        );
        assert_eq!(first.key, "reindex_all:page,post:offset:0");
        assert_eq!(next.key, "reindex_all:page,post:offset:2");
        assert_eq!(first.target_id, None);
    }

    #[test]
    fn test_unknown_type_uses_payload() {
        let a = derive_dedupe_key("sync_vectors", &json!({"shard": 1}));
        let b = derive_dedupe_key("sync_vectors", &json!({"shard": 2}));
        assert_ne!(a.key, b.key);
    }
}
