//! Core type definitions used across the IndexHub workspace.

pub mod content;
pub mod pagination;

pub use content::ContentItem;
pub use pagination::{PageRequest, PageResponse};
