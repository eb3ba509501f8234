//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Single-shot operations surface the first violated precondition and
/// commit no partial effect.
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is zero or would overflow a balance
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller role is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Wallet or transaction not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key is already bound
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Wallet is frozen
    #[error("Wallet frozen: {0}")]
    WalletFrozen(String),

    /// Balance lower than the requested debit
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Amount above the sender's tier limit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Concurrent write detected by the versioned store; the caller retries
    #[error("Store conflict on key {0}")]
    Conflict(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
