//! Pagination types for list operations.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_LIMIT: u64 = 25;
/// Maximum page size.
const MAX_LIMIT: u64 = 500;

/// Limit/offset parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u64,
}

impl PageRequest {
    /// Create a new page request, clamping the limit to a sane range.
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Limit that produced this page.
    pub limit: u64,
    /// Offset that produced this page.
    pub offset: u64,
    /// Total number of matching items.
    pub total_items: u64,
    /// Whether more items exist past this page.
    pub has_next: bool,
}

impl<T: Serialize> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, page: &PageRequest, total_items: u64) -> Self {
        let has_next = page.offset + (items.len() as u64) < total_items;
        Self {
            items,
            limit: page.limit,
            offset: page.offset,
            total_items,
            has_next,
        }
    }
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(10_000, 0).limit, MAX_LIMIT);
    }

    #[test]
    fn test_has_next() {
        let page = PageRequest::new(2, 0);
        let resp = PageResponse::new(vec![1, 2], &page, 3);
        assert!(resp.has_next);
        let page = PageRequest::new(2, 2);
        let resp = PageResponse::new(vec![3], &page, 3);
        assert!(!resp.has_next);
    }
}
