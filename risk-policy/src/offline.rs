//! Risk caps for offline purses and payment intents

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Offline risk policy
///
/// Bounds how much value can sit on a device, how large a single offline
/// intent may be, and how stale a device may go before its spends are
/// rejected until it re-syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflinePolicy {
    /// Maximum shadow balance a purse may hold (smallest units)
    pub max_offline_balance: u64,

    /// Maximum amount of a single offline intent (smallest units)
    pub max_intent_amount: u64,

    /// Hours since last sync before offline spends are rejected
    pub sync_ttl_hours: i64,
}

impl Default for OfflinePolicy {
    fn default() -> Self {
        Self {
            max_offline_balance: 500,
            max_intent_amount: 50,
            sync_ttl_hours: 7 * 24,
        }
    }
}

impl OfflinePolicy {
    /// Sync-staleness threshold as a duration
    pub fn sync_ttl(&self) -> Duration {
        Duration::hours(self.sync_ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = OfflinePolicy::default();
        assert_eq!(policy.max_offline_balance, 500);
        assert_eq!(policy.max_intent_amount, 50);
        assert_eq!(policy.sync_ttl(), Duration::days(7));
    }
}
