//! Records owned by the offline reconciliation engine

use chrono::{DateTime, Duration, Utc};
use ledger_core::BatchOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identifier derived from the registered public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create from an existing id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the stable id from a hex public key: `dev-` + first 8 chars
    pub fn derive(public_key_hex: &str) -> Self {
        let prefix: String = public_key_hex.chars().take(8).collect();
        Self(format!("dev-{prefix}"))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device trust state; mutated only by risk operations outside this engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustedStatus {
    /// Device in good standing
    Trusted,
    /// Device flagged by fraud response
    Compromised,
}

/// A registered offline-capable device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Stable id derived from the public key
    pub id: DeviceId,

    /// Hex Ed25519 public key the device signs intents with
    pub public_key: String,

    /// Owning user
    pub user_id: String,

    /// Hardware identifier reported at registration
    pub hardware_id: String,

    /// OS version reported at registration
    pub os_version: String,

    /// Last-observed intent counter, advisory
    pub counter: u64,

    /// Trust state
    pub trusted_status: TrustedStatus,

    /// Last successful sync
    pub last_sync_at: DateTime<Utc>,

    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Purse lifecycle status
///
/// The TTL lock is advisory: it is surfaced on reads, while reconciliation
/// re-checks staleness per intent regardless of the stored label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurseStatus {
    /// Purse can be spent offline
    Active,
    /// Device has not synced within the TTL
    LockedTtl,
}

/// Device-local shadow balance pre-funded from the online wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflinePurse {
    /// Owning device (1:1)
    pub device_id: DeviceId,

    /// Owning user
    pub user_id: String,

    /// Shadow balance in smallest units
    pub balance: u64,

    /// Stored status label
    pub status: PurseStatus,

    /// Last successful fund or reconcile
    pub last_sync_at: DateTime<Utc>,
}

impl OfflinePurse {
    /// Status with the sync TTL applied; stale purses read as locked
    pub fn status_at(&self, now: DateTime<Utc>, sync_ttl: Duration) -> PurseStatus {
        if now - self.last_sync_at > sync_ttl {
            PurseStatus::LockedTtl
        } else {
            self.status
        }
    }
}

/// Unsigned payment intent payload
///
/// Devices serialize this canonically and sign the bytes; `sign` produces
/// the wire object with the exact signed string carried alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Paying device
    pub payer_id: DeviceId,
    /// Payee device id, or a bare user id for online payees
    pub payee_id: String,
    /// Amount in smallest units
    pub amount: u64,
    /// Strictly increasing per-device replay counter
    pub counter: u64,
    /// Random single-use value
    pub nonce: String,
}

impl PaymentIntent {
    /// Serialize canonically and sign with the device key
    pub fn sign(&self, keypair: &crate::crypto::KeyPair) -> SignedPaymentIntent {
        let intent = serde_json::to_string(self).expect("serialization cannot fail");
        let signature = keypair.sign_hex(intent.as_bytes());

        SignedPaymentIntent {
            payer_id: self.payer_id.clone(),
            payee_id: self.payee_id.clone(),
            amount: self.amount,
            counter: self.counter,
            nonce: self.nonce.clone(),
            intent,
            signature,
        }
    }
}

/// Signed, unsettled offline payment instruction
///
/// `intent` is the exact byte sequence the device signed; verification runs
/// over those bytes, never a re-serialization of the envelope fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedPaymentIntent {
    /// Paying device
    pub payer_id: DeviceId,
    /// Payee device id, or a bare user id
    pub payee_id: String,
    /// Amount in smallest units
    pub amount: u64,
    /// Per-device replay counter
    pub counter: u64,
    /// Random single-use value
    pub nonce: String,
    /// Canonical payload the device signed
    pub intent: String,
    /// Hex Ed25519 signature over `intent`
    pub signature: String,
}

/// Issuer-signed proof of authorized purse funding
///
/// An emitted artifact: nothing in this engine verifies it later; the
/// device or a downstream audit step may.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingCertificate {
    /// Funded device
    pub device_id: DeviceId,
    /// Funded amount
    pub amount: u64,
    /// Unix timestamp of the funding
    pub timestamp: i64,
    /// Hex Ed25519 issuer signature over [`FundingCertificate::message`]
    pub signature: String,
}

impl FundingCertificate {
    /// The exact string the issuer signed
    pub fn message(&self) -> String {
        format!("{}:{}:{}", self.device_id, self.amount, self.timestamp)
    }
}

/// Why an intent was rejected during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Empty signature field
    MissingSignature,
    /// Payer device not registered
    DeviceNotFound,
    /// Ed25519 verification failed
    InvalidSignature,
    /// Amount above the per-intent cap
    AmountExceeded,
    /// Payer has no funded purse
    PurseNotFound,
    /// Device has not synced within the TTL
    TtlExpired,
    /// Shadow balance below the intent amount
    InsufficientBalance,
    /// Counter already consumed; treated as a fraud signal
    DoubleSpend,
}

impl RejectReason {
    /// Stable label, used in metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingSignature => "missing_signature",
            RejectReason::DeviceNotFound => "device_not_found",
            RejectReason::InvalidSignature => "invalid_signature",
            RejectReason::AmountExceeded => "amount_exceeded",
            RejectReason::PurseNotFound => "purse_not_found",
            RejectReason::TtlExpired => "ttl_expired",
            RejectReason::InsufficientBalance => "insufficient_balance",
            RejectReason::DoubleSpend => "double_spend",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate result of a reconcile call
///
/// Failures are per-entry: `failures` pairs each rejected intent's index in
/// the submitted batch with its reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Intents that passed every check and were consumed
    pub valid_count: usize,
    /// Intents rejected
    pub failed_count: usize,
    /// Index-tagged rejection reasons
    pub failures: Vec<(usize, RejectReason)>,
    /// Ledger settlement outcome, when any intent was valid
    pub ledger_outcome: Option<BatchOutcome>,
}

/// Record kept for each consumed `(device, counter)` pair
///
/// Append-only anti-replay ledger; existence of a key is the double-spend
/// gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsedCounter {
    /// Spending device
    pub device_id: DeviceId,
    /// Consumed counter value
    pub counter: u64,
    /// SHA-256 of the signed intent bytes
    pub intent_digest: [u8; 32],
    /// Consumption time
    pub consumed_at: DateTime<Utc>,
}
