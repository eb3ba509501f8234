//! Ledger engine
//!
//! Owns wallet and transaction records in the versioned store and enforces
//! the mint/redeem/transfer/freeze invariants under the injected
//! authorization roles and tier-limit policy.
//!
//! Every mutation is expressed as one atomic [`WriteBatch`]; on a store
//! conflict the operation fails with [`Error::Conflict`] and the caller
//! retries. The engine takes no locks of its own.

use crate::{
    config::LedgerConfig,
    events::{EventSink, LedgerEvent, NullSink},
    metrics::Metrics,
    store::{KvStore, Version, WriteBatch},
    types::{BatchOutcome, Role, Transaction, TransferProof, TxKind, Wallet, WalletId, WalletStatus},
    Error, Result,
};
use chrono::Utc;
use risk_policy::Tier;
use std::sync::Arc;
use uuid::Uuid;

const WALLET_PREFIX: &str = "wallet/";
const TX_PREFIX: &str = "tx/";

fn wallet_key(id: &WalletId) -> String {
    format!("{WALLET_PREFIX}{id}")
}

fn tx_key(id: &str) -> String {
    format!("{TX_PREFIX}{id}")
}

/// Ledger engine over a versioned store
pub struct Ledger {
    store: Arc<dyn KvStore>,
    config: LedgerConfig,
    sink: Arc<dyn EventSink>,
    metrics: Metrics,
}

impl Ledger {
    /// Create an engine over `store` with the given policy configuration
    pub fn new(store: Arc<dyn KvStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            sink: Arc::new(NullSink),
            metrics: Metrics::default(),
        }
    }

    /// Attach an event sink for the analytics stream
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Metrics handle
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Create a wallet with zero balance
    pub fn create_wallet(
        &self,
        id: WalletId,
        owner_id: impl Into<String>,
        intermediary_id: impl Into<String>,
        tier: Tier,
    ) -> Result<Wallet> {
        let key = wallet_key(&id);
        if self.store.get(&key).is_some() {
            return Err(Error::AlreadyExists(format!("wallet {id}")));
        }

        let wallet = Wallet {
            id: id.clone(),
            owner_id: owner_id.into(),
            intermediary_id: intermediary_id.into(),
            tier,
            status: WalletStatus::Active,
            balance: 0,
        };

        let mut batch = WriteBatch::new();
        batch.create(key, bincode::serialize(&wallet)?);
        self.apply(batch)?;

        tracing::info!(wallet = %id, tier = %tier, "wallet created");
        Ok(wallet)
    }

    /// Mint new currency into a wallet; central bank only
    pub fn issue(&self, role: Role, to: &WalletId, amount: u64) -> Result<Transaction> {
        if role != Role::CentralBank {
            return Err(Error::Unauthorized(
                "only the central bank can issue".to_string(),
            ));
        }
        if amount == 0 {
            return Err(Error::InvalidAmount("amount must be positive".to_string()));
        }

        let (mut wallet, version) = self.load_wallet(to)?;
        wallet.balance = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::InvalidAmount(format!("balance overflow on {to}")))?;

        let tx = self.new_record(
            TxKind::Mint,
            self.config.central_bank_account.clone(),
            to.as_str().to_string(),
            amount,
            None,
        );

        let mut batch = WriteBatch::new();
        batch.update(wallet_key(to), bincode::serialize(&wallet)?, version);
        batch.create(tx_key(&tx.id), bincode::serialize(&tx)?);
        self.apply(batch)?;

        self.metrics.record_transaction(TxKind::Mint.as_str());
        tracing::info!(wallet = %to, amount, tx = %tx.id, "issued");
        Ok(tx)
    }

    /// Burn currency from a wallet; central bank only
    pub fn redeem(&self, role: Role, from: &WalletId, amount: u64) -> Result<Transaction> {
        if role != Role::CentralBank {
            return Err(Error::Unauthorized(
                "only the central bank can redeem".to_string(),
            ));
        }
        if amount == 0 {
            return Err(Error::InvalidAmount("amount must be positive".to_string()));
        }

        let (mut wallet, version) = self.load_wallet(from)?;
        wallet.balance = wallet.balance.checked_sub(amount).ok_or_else(|| {
            Error::InsufficientFunds(format!("{from} holds {}, needs {amount}", wallet.balance))
        })?;

        let tx = self.new_record(
            TxKind::Redeem,
            from.as_str().to_string(),
            self.config.central_bank_account.clone(),
            amount,
            None,
        );

        let mut batch = WriteBatch::new();
        batch.update(wallet_key(from), bincode::serialize(&wallet)?, version);
        batch.create(tx_key(&tx.id), bincode::serialize(&tx)?);
        self.apply(batch)?;

        self.metrics.record_transaction(TxKind::Redeem.as_str());
        tracing::info!(wallet = %from, amount, tx = %tx.id, "redeemed");
        Ok(tx)
    }

    /// Move value between wallets
    ///
    /// The core primitive behind direct payments and settled offline
    /// intents. Validation order is part of the contract: the first failing
    /// check names the error, and nothing is committed on failure.
    pub fn transfer(&self, from: &WalletId, to: &WalletId, amount: u64) -> Result<Transaction> {
        self.apply_transfer(None, from, to, amount, TxKind::Transfer, None)
    }

    /// Settle pre-validated offline transfer instructions
    ///
    /// Entries are independent: a failing entry is logged, counted, and
    /// skipped while the rest commit. Entry `i` is recorded under
    /// `"{base_id}-batch-{i}"`.
    pub fn batch_reconcile(&self, base_id: &str, proofs: &[TransferProof]) -> BatchOutcome {
        let mut success_count = 0;

        for (index, proof) in proofs.iter().enumerate() {
            let id = format!("{base_id}-batch-{index}");
            let applied = self.apply_transfer(
                Some(id.clone()),
                &proof.from,
                &proof.to,
                proof.amount,
                TxKind::OfflineReconcile,
                Some(proof.signature.clone()),
            );
            match applied {
                Ok(_) => success_count += 1,
                Err(err) => {
                    tracing::warn!(tx = %id, from = %proof.from, to = %proof.to, %err, "batch entry skipped");
                }
            }
        }

        self.metrics.record_batch(proofs.len());
        tracing::info!(
            batch = %base_id,
            success = success_count,
            total = proofs.len(),
            "batch reconciled"
        );

        BatchOutcome {
            success_count,
            total_count: proofs.len(),
        }
    }

    /// Freeze a wallet; central bank or regulator
    pub fn freeze_wallet(&self, role: Role, id: &WalletId) -> Result<()> {
        if !matches!(role, Role::CentralBank | Role::Regulator) {
            return Err(Error::Unauthorized(
                "only the central bank or a regulator can freeze".to_string(),
            ));
        }
        self.set_status(id, WalletStatus::Frozen)
    }

    /// Unfreeze a wallet; central bank only
    pub fn unfreeze_wallet(&self, role: Role, id: &WalletId) -> Result<()> {
        if role != Role::CentralBank {
            return Err(Error::Unauthorized(
                "only the central bank can unfreeze".to_string(),
            ));
        }
        self.set_status(id, WalletStatus::Active)
    }

    /// Wallet state by id
    pub fn get_wallet(&self, id: &WalletId) -> Result<Wallet> {
        self.load_wallet(id).map(|(wallet, _)| wallet)
    }

    /// Transaction record by id
    pub fn get_transaction(&self, id: &str) -> Result<Transaction> {
        let (bytes, _) = self
            .store
            .get(&tx_key(id))
            .ok_or_else(|| Error::NotFound(format!("transaction {id}")))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Sum of all wallet balances
    ///
    /// An O(n) scan over the wallet keyspace. Acceptable for moderate
    /// wallet counts; at production scale this becomes a running total
    /// maintained transactionally on every mint and redeem.
    pub fn get_total_supply(&self) -> Result<u64> {
        let mut total: u64 = 0;
        for (_, bytes, _) in self.store.scan_prefix(WALLET_PREFIX) {
            let wallet: Wallet = bincode::deserialize(&bytes)?;
            total = total
                .checked_add(wallet.balance)
                .ok_or_else(|| Error::Storage("total supply overflow".to_string()))?;
        }
        Ok(total)
    }

    /// Check the conservation invariant
    ///
    /// Recomputes Σ balances against Σ minted − Σ redeemed from the
    /// transaction log. Critical for financial correctness; cheap enough to
    /// assert after every test scenario.
    pub fn check_conservation(&self) -> Result<bool> {
        let supply = self.get_total_supply()?;

        let mut minted: u64 = 0;
        let mut redeemed: u64 = 0;
        for (_, bytes, _) in self.store.scan_prefix(TX_PREFIX) {
            let tx: Transaction = bincode::deserialize(&bytes)?;
            match tx.kind {
                TxKind::Mint => minted += tx.amount,
                TxKind::Redeem => redeemed += tx.amount,
                _ => {}
            }
        }

        Ok(minted
            .checked_sub(redeemed)
            .map_or(false, |net| net == supply))
    }

    // --- internals ---

    fn apply_transfer(
        &self,
        id: Option<String>,
        from: &WalletId,
        to: &WalletId,
        amount: u64,
        kind: TxKind,
        signature: Option<String>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(Error::InvalidAmount("amount must be positive".to_string()));
        }
        if from == to {
            return Err(Error::InvalidAmount(format!("self transfer on {from}")));
        }

        let (mut sender, sender_version) = self.load_wallet(from)?;
        if !sender.is_active() {
            return Err(Error::WalletFrozen(format!("sender {from}")));
        }
        sender.balance = sender.balance.checked_sub(amount).ok_or_else(|| {
            Error::InsufficientFunds(format!("{from} holds {}, needs {amount}", sender.balance))
        })?;
        if !self.config.tier_limits.allows(sender.tier, amount) {
            return Err(Error::LimitExceeded(format!(
                "{amount} above {} limit {}",
                sender.tier,
                self.config.tier_limits.limit(sender.tier)
            )));
        }

        let (mut receiver, receiver_version) = self.load_wallet(to)?;
        if !receiver.is_active() {
            return Err(Error::WalletFrozen(format!("receiver {to}")));
        }
        receiver.balance = receiver
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::InvalidAmount(format!("balance overflow on {to}")))?;

        let tx = match id {
            Some(id) => {
                if self.store.get(&tx_key(&id)).is_some() {
                    return Err(Error::AlreadyExists(format!("transaction {id}")));
                }
                Transaction {
                    id,
                    kind,
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                    amount,
                    timestamp: Utc::now(),
                    signature,
                }
            }
            None => self.new_record(
                kind,
                from.as_str().to_string(),
                to.as_str().to_string(),
                amount,
                signature,
            ),
        };

        let mut batch = WriteBatch::new();
        batch.update(wallet_key(from), bincode::serialize(&sender)?, sender_version);
        batch.update(
            wallet_key(to),
            bincode::serialize(&receiver)?,
            receiver_version,
        );
        batch.create(tx_key(&tx.id), bincode::serialize(&tx)?);
        self.apply(batch)?;

        self.metrics.record_transaction(kind.as_str());
        self.sink.publish(LedgerEvent::Transfer(tx.clone()));
        tracing::info!(from = %from, to = %to, amount, tx = %tx.id, kind = %kind, "transfer committed");
        Ok(tx)
    }

    fn set_status(&self, id: &WalletId, status: WalletStatus) -> Result<()> {
        let (mut wallet, version) = self.load_wallet(id)?;
        if wallet.status == status {
            // idempotent
            return Ok(());
        }
        wallet.status = status;

        let mut batch = WriteBatch::new();
        batch.update(wallet_key(id), bincode::serialize(&wallet)?, version);
        self.apply(batch)?;

        tracing::info!(wallet = %id, ?status, "wallet status changed");
        Ok(())
    }

    fn new_record(
        &self,
        kind: TxKind,
        from: String,
        to: String,
        amount: u64,
        signature: Option<String>,
    ) -> Transaction {
        Transaction {
            id: Uuid::now_v7().to_string(),
            kind,
            from,
            to,
            amount,
            timestamp: Utc::now(),
            signature,
        }
    }

    fn load_wallet(&self, id: &WalletId) -> Result<(Wallet, Version)> {
        let (bytes, version) = self
            .store
            .get(&wallet_key(id))
            .ok_or_else(|| Error::NotFound(format!("wallet {id}")))?;
        Ok((bincode::deserialize(&bytes)?, version))
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        match self.store.apply(batch) {
            Ok(()) => Ok(()),
            Err(err) => {
                if matches!(err, Error::Conflict(_)) {
                    self.metrics.record_conflict();
                }
                Err(err)
            }
        }
    }
}
