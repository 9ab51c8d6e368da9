//! # indexhub-database
//!
//! Persistence for the job queue. The [`store`] module defines the
//! [`JobStore`] and [`StateStore`] seams; `repositories` implements them
//! on PostgreSQL and `memory` implements them in-process for single-node
//! use and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{EnqueueOutcome, JobStore, StateStore, StateStoreExt};
