//! Built-in job handler implementations.

pub mod cleanup;
pub mod item;
pub mod reindex_all;

pub use cleanup::CleanupJobHandler;
pub use item::ItemIndexHandler;
pub use reindex_all::{REINDEX_ALL_COOLDOWN, ReindexAllHandler};
