//! Background job domain entities.

pub mod dedupe;
pub mod kind;
pub mod model;
pub mod payload;
pub mod status;

pub use dedupe::{DedupeKey, derive_dedupe_key};
pub use kind::JobKind;
pub use model::{Job, NewJob, QueueStats};
pub use payload::{CleanupPayload, ItemPayload, ReindexAllPayload};
pub use status::JobStatus;
