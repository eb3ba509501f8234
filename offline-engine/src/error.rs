//! Error types for the offline reconciliation engine
//!
//! These cover single-shot operations (registration, funding, reads).
//! Per-intent rejections inside a reconcile batch are not errors; they are
//! reported as [`crate::types::RejectReason`] values in the batch result.

use thiserror::Error;

/// Result type for offline-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Offline-engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Public key does not decode to exactly 32 bytes
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Device not registered
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No purse funded for the device
    #[error("Purse not found: {0}")]
    PurseNotFound(String),

    /// Device id already registered
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Funding would push the purse over the offline cap
    #[error("Offline balance limit exceeded: {0}")]
    BalanceLimitExceeded(String),

    /// Online wallet could not cover the funding lock
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Wallet-locking collaborator failed or timed out
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Ledger engine error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
