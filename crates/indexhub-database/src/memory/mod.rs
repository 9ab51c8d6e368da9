//! In-process store backends for single-node deployments and tests.

pub mod job;
pub mod state;

pub use job::MemoryJobStore;
pub use state::MemoryStateStore;
