//! # indexhub-core
//!
//! Core crate for IndexHub. Contains the configuration schema, the
//! unified error system, pagination types, the clock abstraction, and
//! the traits for the external content collaborators that job handlers
//! delegate to.
//!
//! This crate has **no** internal dependencies on other IndexHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
