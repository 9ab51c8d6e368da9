//! Content item references.

use serde::{Deserialize, Serialize};

/// A reference to one indexable content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Item identifier in the host CMS.
    pub id: i64,
    /// Item type (e.g. `"post"`, `"page"`).
    pub item_type: String,
}

impl ContentItem {
    /// Create a new item reference.
    pub fn new(id: i64, item_type: impl Into<String>) -> Self {
        Self {
            id,
            item_type: item_type.into(),
        }
    }
}
