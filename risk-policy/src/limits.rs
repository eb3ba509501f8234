//! Wallet tiers and per-transaction transfer limits

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Wallet risk tier
///
/// Tiers bound the size of a single transfer a wallet may originate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Low-KYC wallets, smallest limits
    Tier0,
    /// Standard retail wallets
    Tier1,
    /// Merchant and intermediary wallets
    Tier2,
}

impl Tier {
    /// Parse from the wire representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Tier0" => Some(Tier::Tier0),
            "Tier1" => Some(Tier::Tier1),
            "Tier2" => Some(Tier::Tier2),
            _ => None,
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier0 => "Tier0",
            Tier::Tier1 => "Tier1",
            Tier::Tier2 => "Tier2",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-transaction transfer ceilings by tier, in smallest currency units
///
/// A tier absent from the table has limit 0 and is always rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierLimits(HashMap<Tier, u64>);

impl Default for TierLimits {
    fn default() -> Self {
        Self(HashMap::from([
            (Tier::Tier0, 10_000),
            (Tier::Tier1, 100_000),
            (Tier::Tier2, 1_000_000),
        ]))
    }
}

impl TierLimits {
    /// Build from an explicit table
    pub fn new(limits: HashMap<Tier, u64>) -> Self {
        Self(limits)
    }

    /// Ceiling for a single transfer originated by a wallet of `tier`
    pub fn limit(&self, tier: Tier) -> u64 {
        self.0.get(&tier).copied().unwrap_or(0)
    }

    /// Check a transfer amount against the sender's tier
    pub fn allows(&self, tier: Tier, amount: u64) -> bool {
        amount <= self.limit(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_str() {
        assert_eq!(Tier::from_str("Tier0"), Some(Tier::Tier0));
        assert_eq!(Tier::from_str("Tier2"), Some(Tier::Tier2));
        assert_eq!(Tier::from_str("Tier9"), None);
    }

    #[test]
    fn test_default_limits() {
        let limits = TierLimits::default();
        assert_eq!(limits.limit(Tier::Tier0), 10_000);
        assert_eq!(limits.limit(Tier::Tier1), 100_000);
        assert_eq!(limits.limit(Tier::Tier2), 1_000_000);
    }

    #[test]
    fn test_boundary() {
        let limits = TierLimits::default();
        assert!(limits.allows(Tier::Tier0, 10_000));
        assert!(!limits.allows(Tier::Tier0, 10_001));
    }

    #[test]
    fn test_absent_tier_always_rejected() {
        let limits = TierLimits::new(HashMap::from([(Tier::Tier1, 500)]));
        assert_eq!(limits.limit(Tier::Tier0), 0);
        assert!(!limits.allows(Tier::Tier0, 1));
        assert!(limits.allows(Tier::Tier1, 500));
    }
}
