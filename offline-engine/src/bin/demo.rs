//! End-to-end offline payment round trip against in-memory components
//!
//! Creates wallets, registers a device, funds its purse, signs an intent,
//! reconciles it, then replays it to show the double-spend rejection.

use ledger_core::{BroadcastSink, Ledger, LedgerConfig, MemoryStore, Role, WalletId};
use offline_engine::crypto::KeyPair;
use offline_engine::{OfflineConfig, OfflineEngine, PaymentIntent, StaticBalanceLock};
use risk_policy::Tier;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting offline payment demo");

    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(BroadcastSink::new(64));
    let mut events = sink.subscribe();

    let ledger = Arc::new(Ledger::new(store.clone(), LedgerConfig::default()).with_sink(sink.clone()));

    // online wallets
    let alice_wallet = WalletId::new("wallet-alice");
    let bob_wallet = WalletId::new("wallet-bob");
    ledger.create_wallet(alice_wallet.clone(), "alice", "bank-1", Tier::Tier1)?;
    ledger.create_wallet(bob_wallet.clone(), "bob", "bank-1", Tier::Tier1)?;
    ledger.issue(Role::CentralBank, &alice_wallet, 1_000)?;

    // offline engine with an in-memory wallet-lock collaborator
    let lock = Arc::new(StaticBalanceLock::new());
    lock.set_available("alice", 1_000);
    let engine = OfflineEngine::new(
        store,
        ledger.clone(),
        lock,
        KeyPair::generate(),
        OfflineConfig::default(),
    )
    .with_sink(sink.clone());

    // device registration and purse funding
    let device_keys = KeyPair::generate();
    let device = engine.register_device("alice", &device_keys.public_key_hex(), "hw-77", "os-14")?;
    let (purse, certificate) = engine.fund_purse("alice", &device.id, 100).await?;
    tracing::info!(
        device = %device.id,
        balance = purse.balance,
        certificate = %certificate.signature,
        "purse funded"
    );

    // the device signs an intent while offline
    let signed = PaymentIntent {
        payer_id: device.id.clone(),
        payee_id: "bob".to_string(),
        amount: 50,
        counter: 1,
        nonce: "nonce-1".to_string(),
    }
    .sign(&device_keys);

    // back online: reconcile
    let report = engine.reconcile(&device.id, &[signed.clone()]).await?;
    tracing::info!(valid = report.valid_count, failed = report.failed_count, "reconciled");

    // replaying the same signed intent must be rejected
    let replay = engine.reconcile(&device.id, &[signed]).await?;
    tracing::info!(
        valid = replay.valid_count,
        failures = ?replay.failures,
        "replay rejected"
    );

    tracing::info!(
        alice = ledger.get_wallet(&alice_wallet)?.balance,
        bob = ledger.get_wallet(&bob_wallet)?.balance,
        purse = engine.get_purse(&device.id)?.balance,
        total_supply = ledger.get_total_supply()?,
        conserved = ledger.check_conservation()?,
        "final state"
    );

    while let Ok(event) = events.try_recv() {
        tracing::info!(?event, "analytics event");
    }

    Ok(())
}
