//! # indexhub-entity
//!
//! Entity models for IndexHub. Structs in `job` and `dead_letter`
//! represent table rows and derive `sqlx::FromRow`; structs in `state`
//! are JSON documents persisted in the keyed `worker_state` table.

pub mod dead_letter;
pub mod job;
pub mod state;
