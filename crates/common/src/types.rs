use serde::{Deserialize, Serialize};

/// Number of sompi in one KAS.
pub const SOMPI_PER_KASPA: u64 = 100_000_000;

pub fn sompi_to_kaspa(sompi: u64) -> f64 {
    sompi as f64 / SOMPI_PER_KASPA as f64
}

/// Last time an IP received funds. One record per IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub ip: String,
    /// Milliseconds since the Unix epoch.
    pub last_use: i64,
}
