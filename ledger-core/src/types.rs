//! Core types for the CBDC ledger
//!
//! All records are designed for deterministic serialization (bincode in the
//! store) and exact integer arithmetic in smallest currency units.

use chrono::{DateTime, Utc};
use risk_policy::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(String);

impl WalletId {
    /// Create new wallet ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated caller role, injected per call by the identity context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Central bank operator identity
    CentralBank,
    /// Financial regulator identity
    Regulator,
    /// Any other authenticated caller
    Other,
}

/// Wallet lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletStatus {
    /// Wallet can send and receive
    Active,
    /// Wallet excluded from transfers until unfrozen
    Frozen,
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Central-bank issuance
    Mint,
    /// Central-bank redemption (burn)
    Redeem,
    /// Wallet-to-wallet transfer
    Transfer,
    /// Transfer settled from an offline batch
    OfflineReconcile,
}

impl TxKind {
    /// Stable label, used in metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Mint => "mint",
            TxKind::Redeem => "redeem",
            TxKind::Transfer => "transfer",
            TxKind::OfflineReconcile => "offline_reconcile",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A custodial wallet holding a CBDC balance
///
/// Created once, never deleted; the balance moves only through
/// issue/redeem/transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet id
    pub id: WalletId,

    /// Pseudonymous owner id
    pub owner_id: String,

    /// Intermediary (custodian bank) id
    pub intermediary_id: String,

    /// Risk tier bounding per-transaction transfer size
    pub tier: Tier,

    /// Lifecycle status
    pub status: WalletStatus,

    /// Balance in smallest currency units
    pub balance: u64,
}

impl Wallet {
    /// Whether the wallet may take part in transfers
    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }
}

/// Immutable ledger transaction record, append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique id; batch entries derive theirs from the batch id
    pub id: String,

    /// Kind of movement
    pub kind: TxKind,

    /// Debited account (the central-bank label for mints)
    pub from: String,

    /// Credited account (the central-bank label for redemptions)
    pub to: String,

    /// Amount in smallest currency units, always positive
    pub amount: u64,

    /// Commit time
    pub timestamp: DateTime<Utc>,

    /// Device signature, carried on offline-reconciled entries
    pub signature: Option<String>,
}

/// Pre-validated transfer instruction settled through `batch_reconcile`
///
/// Produced by the reconciliation engine after signature and risk checks;
/// the ledger re-validates wallet state per entry but not the signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProof {
    /// Payer wallet
    pub from: WalletId,
    /// Payee wallet
    pub to: WalletId,
    /// Amount in smallest units
    pub amount: u64,
    /// Replay counter the intent consumed
    pub nonce: u64,
    /// Hex Ed25519 device signature
    pub signature: String,
}

/// Outcome of a batch reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Entries committed
    pub success_count: usize,
    /// Entries submitted
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_id_display() {
        let id = WalletId::new("wallet-alice");
        assert_eq!(id.to_string(), "wallet-alice");
        assert_eq!(id.as_str(), "wallet-alice");
    }

    #[test]
    fn test_tx_kind_labels() {
        assert_eq!(TxKind::Mint.as_str(), "mint");
        assert_eq!(TxKind::OfflineReconcile.as_str(), "offline_reconcile");
    }

    #[test]
    fn test_wallet_is_active() {
        let mut wallet = Wallet {
            id: WalletId::new("w1"),
            owner_id: "owner".to_string(),
            intermediary_id: "bank".to_string(),
            tier: Tier::Tier0,
            status: WalletStatus::Active,
            balance: 0,
        };
        assert!(wallet.is_active());

        wallet.status = WalletStatus::Frozen;
        assert!(!wallet.is_active());
    }
}
