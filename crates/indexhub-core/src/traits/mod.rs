//! Core traits defined in `indexhub-core` and implemented by other crates.

pub mod clock;
pub mod content;

pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentIndexer, ContentSource};
