//! Offline reconciliation engine
//!
//! Owns the device registry, shadow purses, and the anti-replay counter
//! ledger. Intents are evaluated independently; survivors are settled as
//! one batch against the ledger engine. The engine never reaches into
//! wallet state directly; value moves only through the ledger's public
//! operations.

use crate::{
    config::OfflineConfig,
    crypto::{self, KeyPair},
    lock::{LockError, WalletLock},
    metrics::Metrics,
    types::{
        Device, DeviceId, FundingCertificate, OfflinePurse, PurseStatus, ReconcileReport,
        RejectReason, SignedPaymentIntent, TrustedStatus, UsedCounter,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use ledger_core::{
    BatchSummary, EventSink, KvStore, Ledger, LedgerEvent, NullSink, TransferProof, Version,
    WalletId, WriteBatch,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEVICE_PREFIX: &str = "device/";
const PURSE_PREFIX: &str = "purse/";
const COUNTER_PREFIX: &str = "counter/";

fn device_key(id: &DeviceId) -> String {
    format!("{DEVICE_PREFIX}{id}")
}

fn purse_key(id: &DeviceId) -> String {
    format!("{PURSE_PREFIX}{id}")
}

// zero-padded so per-device scans come out in counter order
fn counter_key(id: &DeviceId, counter: u64) -> String {
    format!("{COUNTER_PREFIX}{id}/{counter:020}")
}

/// Offline reconciliation engine
pub struct OfflineEngine {
    store: Arc<dyn KvStore>,
    ledger: Arc<Ledger>,
    lock: Arc<dyn WalletLock>,
    issuer: KeyPair,
    config: OfflineConfig,
    sink: Arc<dyn EventSink>,
    metrics: Metrics,
}

impl OfflineEngine {
    /// Create an engine over `store`, settling against `ledger`
    pub fn new(
        store: Arc<dyn KvStore>,
        ledger: Arc<Ledger>,
        lock: Arc<dyn WalletLock>,
        issuer: KeyPair,
        config: OfflineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            lock,
            issuer,
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

    /// Issuer verifying key, for funding-certificate audits
    pub fn issuer_public_key(&self) -> [u8; 32] {
        self.issuer.public_key()
    }

    /// Register a device under its Ed25519 public key
    pub fn register_device(
        &self,
        user_id: impl Into<String>,
        public_key_hex: &str,
        hardware_id: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Result<Device> {
        crypto::decode_public_key(public_key_hex)?;

        let id = DeviceId::derive(public_key_hex);
        if self.store.get(&device_key(&id)).is_some() {
            return Err(Error::AlreadyExists(format!("device {id}")));
        }

        let now = Utc::now();
        let device = Device {
            id: id.clone(),
            public_key: public_key_hex.to_string(),
            user_id: user_id.into(),
            hardware_id: hardware_id.into(),
            os_version: os_version.into(),
            counter: 0,
            trusted_status: TrustedStatus::Trusted,
            last_sync_at: now,
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.create(device_key(&id), bincode::serialize(&device)?);
        self.store.apply(batch)?;

        tracing::info!(device = %id, user = %device.user_id, "device registered");
        Ok(device)
    }

    /// Fund a device purse from the online wallet
    ///
    /// The wallet-lock collaborator debits the online wallet before the
    /// shadow purse is credited, so the cap rejection leaves everything
    /// untouched. Returns the new purse state and the issuer-signed funding
    /// certificate.
    pub async fn fund_purse(
        &self,
        user_id: &str,
        device_id: &DeviceId,
        amount: u64,
    ) -> Result<(OfflinePurse, FundingCertificate)> {
        if self.store.get(&device_key(device_id)).is_none() {
            return Err(Error::DeviceNotFound(device_id.to_string()));
        }

        let existing = self.read_purse(device_id);
        let current = existing.as_ref().map(|(purse, _)| purse.balance).unwrap_or(0);
        let cap = self.config.policy.max_offline_balance;
        if current.checked_add(amount).map_or(true, |next| next > cap) {
            return Err(Error::BalanceLimitExceeded(format!(
                "purse {device_id} holds {current}, cap {cap}"
            )));
        }

        let timeout = Duration::from_millis(self.config.lock_timeout_ms);
        let locked = tokio::time::timeout(
            timeout,
            self.lock.lock(user_id, amount, "offline_funding"),
        )
        .await;
        match locked {
            Ok(Ok(())) => {}
            Ok(Err(LockError::InsufficientFunds)) => {
                return Err(Error::InsufficientFunds(format!(
                    "lock of {amount} for {user_id} refused"
                )));
            }
            Ok(Err(LockError::Upstream(reason))) => return Err(Error::Upstream(reason)),
            Err(_) => {
                return Err(Error::Upstream(format!(
                    "wallet lock timed out after {}ms",
                    self.config.lock_timeout_ms
                )));
            }
        }

        let now = Utc::now();
        let mut batch = WriteBatch::new();
        let purse = match existing {
            Some((mut purse, version)) => {
                purse.balance += amount;
                purse.status = PurseStatus::Active;
                purse.last_sync_at = now;
                batch.update(purse_key(device_id), bincode::serialize(&purse)?, version);
                purse
            }
            None => {
                let purse = OfflinePurse {
                    device_id: device_id.clone(),
                    user_id: user_id.to_string(),
                    balance: amount,
                    status: PurseStatus::Active,
                    last_sync_at: now,
                };
                batch.create(purse_key(device_id), bincode::serialize(&purse)?);
                purse
            }
        };
        self.store.apply(batch)?;

        let timestamp = now.timestamp();
        let message = format!("{device_id}:{amount}:{timestamp}");
        let certificate = FundingCertificate {
            device_id: device_id.clone(),
            amount,
            timestamp,
            signature: self.issuer.sign_hex(message.as_bytes()),
        };

        tracing::info!(device = %device_id, amount, balance = purse.balance, "purse funded");
        Ok((purse, certificate))
    }

    /// Settle a batch of signed offline intents against the ledger
    ///
    /// Each intent is evaluated independently, short-circuiting on its first
    /// failing check; one intent's rejection never affects the others.
    /// Valid intents consume their counter and debit the purse before any
    /// ledger effect, and neither is rolled back if settlement fails.
    pub async fn reconcile(
        &self,
        device_id: &DeviceId,
        intents: &[SignedPaymentIntent],
    ) -> Result<ReconcileReport> {
        let now = Utc::now();
        let mut failures: Vec<(usize, RejectReason)> = Vec::new();
        let mut proofs: Vec<TransferProof> = Vec::new();

        for (index, intent) in intents.iter().enumerate() {
            self.metrics.record_intent();
            match self.evaluate_intent(intent, now) {
                Ok(proof) => proofs.push(proof),
                Err(reason) => {
                    if reason == RejectReason::DoubleSpend {
                        self.metrics.record_double_spend();
                        tracing::warn!(
                            device = %intent.payer_id,
                            counter = intent.counter,
                            "double spend detected"
                        );
                    } else {
                        tracing::debug!(device = %intent.payer_id, %reason, "intent rejected");
                    }
                    self.metrics.record_rejection(reason.as_str());
                    failures.push((index, reason));
                }
            }
        }

        let valid_count = proofs.len();
        let mut ledger_outcome = None;
        if !proofs.is_empty() {
            let base_id = Uuid::now_v7().to_string();
            let outcome = self.ledger.batch_reconcile(&base_id, &proofs);
            if outcome.success_count < outcome.total_count {
                // consumed counters and purse debits stay; the shortfall is
                // settled by an out-of-band retry, never by re-validation
                tracing::error!(
                    batch = %base_id,
                    success = outcome.success_count,
                    total = outcome.total_count,
                    "ledger settlement incomplete"
                );
            }
            self.touch_sync_state(device_id, now);
            self.sink.publish(LedgerEvent::BatchReconcile(BatchSummary {
                batch_size: valid_count,
                success_count: outcome.success_count,
                timestamp: now,
            }));
            ledger_outcome = Some(outcome);
        }
        self.metrics.record_batch(intents.len());

        tracing::info!(
            device = %device_id,
            valid = valid_count,
            failed = failures.len(),
            "reconcile complete"
        );

        Ok(ReconcileReport {
            valid_count,
            failed_count: failures.len(),
            failures,
            ledger_outcome,
        })
    }

    /// Registered device record
    pub fn get_device(&self, id: &DeviceId) -> Result<Device> {
        self.read_device(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Purse state with the advisory TTL label applied
    pub fn get_purse(&self, id: &DeviceId) -> Result<OfflinePurse> {
        let (mut purse, _) = self
            .read_purse(id)
            .ok_or_else(|| Error::PurseNotFound(id.to_string()))?;
        purse.status = purse.status_at(Utc::now(), self.config.policy.sync_ttl());
        Ok(purse)
    }

    // --- internals ---

    fn evaluate_intent(
        &self,
        intent: &SignedPaymentIntent,
        now: DateTime<Utc>,
    ) -> std::result::Result<TransferProof, RejectReason> {
        if intent.signature.is_empty() {
            return Err(RejectReason::MissingSignature);
        }

        let device = match self.read_device(&intent.payer_id) {
            Some(device) => device,
            None => return Err(RejectReason::DeviceNotFound),
        };
        let public_key = match crypto::decode_public_key(&device.public_key) {
            Ok(key) => key,
            Err(_) => return Err(RejectReason::InvalidSignature),
        };
        if !crypto::verify_intent(&public_key, intent.intent.as_bytes(), &intent.signature) {
            return Err(RejectReason::InvalidSignature);
        }

        if intent.amount > self.config.policy.max_intent_amount {
            return Err(RejectReason::AmountExceeded);
        }

        let (purse, version) = match self.read_purse(&intent.payer_id) {
            Some(found) => found,
            None => return Err(RejectReason::PurseNotFound),
        };
        if now - purse.last_sync_at > self.config.policy.sync_ttl() {
            return Err(RejectReason::TtlExpired);
        }
        if purse.balance < intent.amount {
            return Err(RejectReason::InsufficientBalance);
        }

        // durability boundary: the counter is consumed before the shadow
        // debit and before any ledger effect
        if !self.consume_counter(&intent.payer_id, intent.counter, intent) {
            return Err(RejectReason::DoubleSpend);
        }

        self.debit_purse(&intent.payer_id, intent.amount, purse, version);

        let payer_wallet = WalletId::new(format!("wallet-{}", device.user_id));
        let payee_user = self
            .read_device(&DeviceId::new(intent.payee_id.clone()))
            .map(|payee| payee.user_id)
            .unwrap_or_else(|| intent.payee_id.clone());
        let payee_wallet = WalletId::new(format!("wallet-{payee_user}"));

        Ok(TransferProof {
            from: payer_wallet,
            to: payee_wallet,
            amount: intent.amount,
            nonce: intent.counter,
            signature: intent.signature.clone(),
        })
    }

    /// Insert the `(device, counter)` pair; false when already consumed
    fn consume_counter(
        &self,
        device_id: &DeviceId,
        counter: u64,
        intent: &SignedPaymentIntent,
    ) -> bool {
        let key = counter_key(device_id, counter);
        if self.store.get(&key).is_some() {
            return false;
        }

        let record = UsedCounter {
            device_id: device_id.clone(),
            counter,
            intent_digest: crypto::intent_digest(intent.intent.as_bytes()),
            consumed_at: Utc::now(),
        };

        let mut batch = WriteBatch::new();
        batch.create(
            key,
            bincode::serialize(&record).expect("serialization cannot fail"),
        );
        // a lost create race reads as already-consumed, never a second spend
        self.store.apply(batch).is_ok()
    }

    fn debit_purse(
        &self,
        device_id: &DeviceId,
        amount: u64,
        purse: OfflinePurse,
        version: Version,
    ) {
        let mut attempt = (purse, version);
        for _ in 0..3 {
            let (mut purse, version) = attempt;
            purse.balance = purse.balance.saturating_sub(amount);
            let mut batch = WriteBatch::new();
            batch.update(
                purse_key(device_id),
                bincode::serialize(&purse).expect("serialization cannot fail"),
                version,
            );
            match self.store.apply(batch) {
                Ok(()) => return,
                Err(_) => match self.read_purse(device_id) {
                    Some(fresh) => attempt = fresh,
                    None => break,
                },
            }
        }

        // the counter stays consumed; the missing debit is repaired out of band
        tracing::error!(device = %device_id, amount, "shadow debit failed after counter consumption");
    }

    /// Refresh the syncing device's purse and device sync stamps
    fn touch_sync_state(&self, device_id: &DeviceId, now: DateTime<Utc>) {
        let mut batch = WriteBatch::new();

        if let Some((mut purse, version)) = self.read_purse(device_id) {
            purse.last_sync_at = now;
            purse.status = PurseStatus::Active;
            batch.update(
                purse_key(device_id),
                bincode::serialize(&purse).expect("serialization cannot fail"),
                version,
            );
        }
        if let Some(mut device) = self.read_device(device_id) {
            if let Some((_, version)) = self.store.get(&device_key(device_id)) {
                device.last_sync_at = now;
                batch.update(
                    device_key(device_id),
                    bincode::serialize(&device).expect("serialization cannot fail"),
                    version,
                );
            }
        }

        if !batch.is_empty() {
            if let Err(err) = self.store.apply(batch) {
                tracing::warn!(device = %device_id, %err, "sync stamp refresh lost a write race");
            }
        }
    }

    fn read_device(&self, id: &DeviceId) -> Option<Device> {
        self.store
            .get(&device_key(id))
            .and_then(|(bytes, _)| bincode::deserialize(&bytes).ok())
    }

    fn read_purse(&self, id: &DeviceId) -> Option<(OfflinePurse, Version)> {
        self.store.get(&purse_key(id)).and_then(|(bytes, version)| {
            bincode::deserialize(&bytes)
                .ok()
                .map(|purse| (purse, version))
        })
    }
}
