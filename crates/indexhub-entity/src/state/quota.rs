//! Per-provider daily usage ledger.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Usage accumulated against one provider on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    /// Requests issued.
    pub requests: u64,
    /// Tokens consumed.
    pub tokens: u64,
    /// Cost incurred, in the provider's billing currency.
    pub cost: f64,
}

/// The whole ledger: provider name, then day, then bucket.
pub type QuotaLedgerData = BTreeMap<String, BTreeMap<NaiveDate, UsageBucket>>;
