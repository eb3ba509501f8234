//! Configuration for the ledger engine
//!
//! The central-bank identity and the tier-limit table are explicit,
//! injected configuration so tests can run with arbitrary roles and limits.

use risk_policy::TierLimits;
use serde::{Deserialize, Serialize};

/// Ledger engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Account label recorded as counterparty on mint and redeem records
    pub central_bank_account: String,

    /// Per-tier transfer ceilings
    pub tier_limits: TierLimits,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            central_bank_account: "CentralBank".to_string(),
            tier_limits: TierLimits::default(),
        }
    }
}

impl LedgerConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LedgerConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut config = LedgerConfig::default();

        if let Ok(account) = std::env::var("LEDGER_CENTRAL_BANK_ACCOUNT") {
            config.central_bank_account = account;
        }

        Ok(config)
    }
}
