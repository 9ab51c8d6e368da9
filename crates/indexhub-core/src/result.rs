//! Convenience result type alias for IndexHub.

use crate::error::AppError;

/// A specialized `Result` type for IndexHub operations.
pub type AppResult<T> = Result<T, AppError>;
