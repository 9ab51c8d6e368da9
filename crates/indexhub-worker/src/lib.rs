//! Background job processing for IndexHub.
//!
//! This crate provides:
//! - A persisted job queue with deduplicated enqueue and a dead-letter path
//! - A bounded worker cycle guarded by an advisory lease
//! - A job executor that dispatches jobs to the correct handler
//! - Built-in handlers for item indexing, the `reindex_all` batch walk, and cleanup
//! - Admission control (cooldowns, concurrency cap, rate limiter, quota ledger)
//! - A cursor-driven bulk indexer and a cron scheduler that triggers all of the above

pub mod admission;
pub mod bulk;
pub mod executor;
pub mod indexer;
pub mod jobs;
pub mod lease;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod service;

pub use bulk::BulkIndexer;
pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{EnqueueOptions, JobQueue};
pub use runner::{CycleReport, WorkerRunner};
pub use scheduler::CronScheduler;
pub use service::{WorkerDeps, WorkerService};
