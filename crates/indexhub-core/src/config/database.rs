//! `[database]` section.

use serde::{Deserialize, Serialize};

/// Job store connection settings. `url` has no default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` URL of the job store.
    pub url: String,
    /// Pool ceiling. Each concurrent cycle holds at most one connection at a time.
    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle.
    #[serde(default = "defaults::min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a free connection.
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Seconds before an idle connection is dropped.
    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_seconds: u64,
}

mod defaults {
    pub fn max_connections() -> u32 {
        10
    }

    pub fn min_connections() -> u32 {
        1
    }

    pub fn connect_timeout() -> u64 {
        10
    }

    pub fn idle_timeout() -> u64 {
        300
    }
}
