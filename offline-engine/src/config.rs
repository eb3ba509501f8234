//! Configuration for the offline engine

use risk_policy::OfflinePolicy;
use serde::{Deserialize, Serialize};

/// Offline engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Risk caps and staleness policy
    pub policy: OfflinePolicy,

    /// Timeout for wallet-lock collaborator calls (milliseconds)
    pub lock_timeout_ms: u64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            policy: OfflinePolicy::default(),
            lock_timeout_ms: 5_000,
        }
    }
}

impl OfflineConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = OfflineConfig::default();

        if let Ok(timeout) = std::env::var("OFFLINE_LOCK_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                config.lock_timeout_ms = timeout;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OfflineConfig::default();
        assert_eq!(config.policy.max_offline_balance, 500);
        assert_eq!(config.policy.max_intent_amount, 50);
        assert_eq!(config.lock_timeout_ms, 5_000);
    }
}
