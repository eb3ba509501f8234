//! CBDC Ledger Core
//!
//! Balance-conserving wallet ledger over a versioned key-value store.
//!
//! # Architecture
//!
//! - **Versioned store**: every mutation is one atomic compare-and-swap batch
//! - **Optimistic concurrency**: conflicting writers lose and retry
//! - **Append-only audit**: transaction records are never modified or deleted
//!
//! # Invariants
//!
//! - Conservation: Σ wallet balances == Σ issued − Σ redeemed, always
//! - Non-negativity: no operation leaves a balance below zero
//! - Frozen wallets take no part in transfers until explicitly unfrozen

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod store;
pub mod types;

// Re-exports
pub use config::LedgerConfig;
pub use error::{Error, Result};
pub use events::{BatchSummary, BroadcastSink, EventSink, LedgerEvent, NullSink};
pub use ledger::Ledger;
pub use store::{KvStore, MemoryStore, Version, WriteBatch};
pub use types::{
    BatchOutcome, Role, Transaction, TransferProof, TxKind, Wallet, WalletId, WalletStatus,
};
