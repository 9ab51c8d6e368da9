//! Error type shared by every IndexHub crate.
//!
//! Store, configuration and collaborator failures are all carried as
//! [`AppError`]; job execution outcomes use the worker's own error type and
//! only wrap an `AppError` when the failure came from infrastructure.

use std::fmt;
use thiserror::Error;

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A job, dead letter, or progress record does not exist.
    NotFound,
    /// Caller input was rejected before touching the store.
    Validation,
    /// A conditional transition found the row in another state.
    Conflict,
    /// A named action exceeded its window.
    RateLimit,
    /// A bug or an unexpected runtime failure.
    Internal,
    /// The database rejected or failed a statement.
    Database,
    /// A payload or state record did not (de)serialize.
    Serialization,
    /// Configuration could not be loaded or is invalid.
    Configuration,
    /// The indexing service failed or answered unexpectedly.
    ExternalService,
    /// Admission control deferred the work.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::RateLimit => "RATE_LIMIT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Whether the same request may succeed if simply tried again later.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServiceUnavailable | Self::ExternalService | Self::Database
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error carried through `?` across IndexHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// Category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Underlying cause, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Build an error without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Build an error wrapping `source`.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Shorthand for `self.kind.is_temporary()`.
    pub fn is_temporary(&self) -> bool {
        self.kind.is_temporary()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, format!("Invalid JSON: {err}"), err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(ErrorKind::Configuration, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_code() {
        let err = AppError::not_found("job 7 not found");
        assert_eq!(err.to_string(), "NOT_FOUND: job 7 not found");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = AppError::from(std::io::Error::other("disk gone"));
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(!err.is_temporary());
    }

    #[test]
    fn test_deferrals_are_temporary() {
        assert!(AppError::rate_limited("slow down").is_temporary());
        assert!(AppError::service_unavailable("quota").is_temporary());
        assert!(!AppError::validation("bad").is_temporary());
    }
}
