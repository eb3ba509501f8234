//! Wallet-locking collaborator
//!
//! Funding a purse debits the user's online wallet through this seam before
//! the shadow purse is credited. The real collaborator is the wallet
//! service; [`StaticBalanceLock`] is the in-memory reference used by tests
//! and the demo.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Failure modes of a lock attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// Online balance cannot cover the lock
    #[error("insufficient online funds")]
    InsufficientFunds,

    /// Collaborator unreachable or failed
    #[error("upstream failure: {0}")]
    Upstream(String),
}

/// Collaborator that locks online wallet funds for offline use
#[async_trait]
pub trait WalletLock: Send + Sync {
    /// Lock `amount` of the user's online funds for `reason`
    async fn lock(&self, user_id: &str, amount: u64, reason: &str)
        -> std::result::Result<(), LockError>;
}

/// In-memory lock collaborator tracking available balance per user
#[derive(Debug, Default)]
pub struct StaticBalanceLock {
    available: DashMap<String, u64>,
}

impl StaticBalanceLock {
    /// Create with no balances
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lockable balance for a user
    pub fn set_available(&self, user_id: impl Into<String>, amount: u64) {
        self.available.insert(user_id.into(), amount);
    }

    /// Remaining lockable balance for a user
    pub fn available(&self, user_id: &str) -> u64 {
        self.available.get(user_id).map(|entry| *entry).unwrap_or(0)
    }
}

#[async_trait]
impl WalletLock for StaticBalanceLock {
    async fn lock(
        &self,
        user_id: &str,
        amount: u64,
        _reason: &str,
    ) -> std::result::Result<(), LockError> {
        let mut entry = self.available.entry(user_id.to_string()).or_insert(0);
        if *entry < amount {
            return Err(LockError::InsufficientFunds);
        }
        *entry -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lock_decrements_available() {
        let lock = StaticBalanceLock::new();
        lock.set_available("alice", 100);

        lock.lock("alice", 60, "offline_funding").await.unwrap();
        assert_eq!(lock.available("alice"), 40);
    }

    #[tokio::test]
    async fn test_lock_insufficient() {
        let lock = StaticBalanceLock::new();
        lock.set_available("alice", 10);

        let result = lock.lock("alice", 60, "offline_funding").await;
        assert_eq!(result, Err(LockError::InsufficientFunds));
        assert_eq!(lock.available("alice"), 10);
    }

    #[tokio::test]
    async fn test_lock_unknown_user() {
        let lock = StaticBalanceLock::new();
        let result = lock.lock("nobody", 1, "offline_funding").await;
        assert_eq!(result, Err(LockError::InsufficientFunds));
    }
}
