//! JSON documents persisted in the keyed worker state table.

pub mod lease;
pub mod progress;
pub mod quota;
pub mod rate;

pub use lease::WorkerLease;
pub use progress::{CooldownRecord, CursorProgress};
pub use quota::{QuotaLedgerData, UsageBucket};
pub use rate::RateWindow;

/// State key for a named advisory lease.
pub fn lease_key(name: &str) -> String {
    format!("lease:{name}")
}

/// State key for a job-class cooldown record.
pub fn cooldown_key(class: &str) -> String {
    format!("cooldown:{class}")
}

/// State key for a cursor progress record.
pub fn progress_key(name: &str) -> String {
    format!("progress:{name}")
}

/// State key for a named-action rate window.
pub fn rate_key(action: &str) -> String {
    format!("rate:{action}")
}

/// State key for the provider quota ledger.
pub const QUOTA_LEDGER_KEY: &str = "quota:ledger";
