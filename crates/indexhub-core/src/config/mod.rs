//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod admission;
pub mod database;
pub mod indexer;
pub mod logging;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::admission::AdmissionConfig;
pub use self::database::DatabaseConfig;
pub use self::indexer::IndexerConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::worker::{BackoffConfig, WorkerConfig};

use crate::error::AppError;
use crate::result::AppResult;

/// Longest span a seconds-valued setting may hold (100 years).
pub const MAX_SETTING_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Convert a seconds-valued setting into a `chrono::Duration`.
///
/// Values above [`MAX_SETTING_SECONDS`] are rejected so that adding the
/// span to a timestamp can never overflow.
pub fn seconds_setting(name: &str, seconds: u64) -> AppResult<chrono::Duration> {
    if seconds > MAX_SETTING_SECONDS {
        return Err(AppError::configuration(format!(
            "{name} = {seconds}s exceeds the {MAX_SETTING_SECONDS}s limit"
        )));
    }
    i64::try_from(seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| AppError::configuration(format!("{name} = {seconds}s is out of range")))
}

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Admission control settings.
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// External indexing service settings.
    #[serde(default)]
    pub indexer: IndexerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay
    /// `config/{env}` and environment variables prefixed with `INDEXHUB`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("INDEXHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from a single explicit file plus environment variables.
    pub fn load_file(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(true))
            .add_source(
                config::Environment::with_prefix("INDEXHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_setting_bounds() {
        assert_eq!(
            seconds_setting("worker.lease_ttl_seconds", 60).unwrap(),
            chrono::Duration::seconds(60)
        );
        assert!(seconds_setting("worker.lease_ttl_seconds", MAX_SETTING_SECONDS).is_ok());

        let err = seconds_setting("worker.lease_ttl_seconds", u64::MAX).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("worker.lease_ttl_seconds"));
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let raw = r#"
            [database]
            url = "postgres://localhost/indexhub"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.worker.scheduled_batch_limit, 3);
        assert_eq!(config.worker.manual_batch_limit, 10);
        assert!(config.worker.stale_threshold_seconds > config.worker.lease_ttl_seconds);
        assert_eq!(config.worker.dead_letter_retention_days, None);
        assert_eq!(config.admission.quota_retention_days, 30);
        assert_eq!(config.indexer.item_types, vec!["post", "page"]);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides_are_respected() {
        let raw = r#"
            [database]
            url = "postgres://localhost/indexhub"

            [worker]
            default_max_attempts = 3
            dead_letter_retention_days = 90

            [worker.backoff]
            base_seconds = 5

            [logging]
            format = "json"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.worker.default_max_attempts, 3);
        assert_eq!(config.worker.dead_letter_retention_days, Some(90));
        assert_eq!(config.worker.backoff.base_seconds, 5);
        assert_eq!(config.worker.backoff.max_seconds, 3600);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
