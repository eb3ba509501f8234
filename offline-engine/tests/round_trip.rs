//! Integration test: the full offline payment round trip across the
//! reconciliation engine and the ledger, including the analytics events.

use ledger_core::{
    BroadcastSink, Ledger, LedgerConfig, LedgerEvent, MemoryStore, Role, TxKind, WalletId,
};
use offline_engine::crypto::KeyPair;
use offline_engine::{
    OfflineConfig, OfflineEngine, PaymentIntent, RejectReason, StaticBalanceLock,
};
use risk_policy::Tier;
use std::sync::Arc;

struct Rig {
    ledger: Arc<Ledger>,
    engine: OfflineEngine,
    sink: Arc<BroadcastSink>,
    device_keys: KeyPair,
}

fn rig() -> Rig {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(BroadcastSink::new(64));
    let ledger = Arc::new(
        Ledger::new(store.clone(), LedgerConfig::default()).with_sink(sink.clone()),
    );

    ledger
        .create_wallet(WalletId::new("wallet-alice"), "alice", "bank-1", Tier::Tier1)
        .unwrap();
    ledger
        .create_wallet(WalletId::new("wallet-bob"), "bob", "bank-1", Tier::Tier1)
        .unwrap();
    ledger
        .issue(Role::CentralBank, &WalletId::new("wallet-alice"), 1_000)
        .unwrap();

    let lock = Arc::new(StaticBalanceLock::new());
    lock.set_available("alice", 1_000);

    let engine = OfflineEngine::new(
        store,
        ledger.clone(),
        lock,
        KeyPair::from_seed(&[9u8; 32]),
        OfflineConfig::default(),
    )
    .with_sink(sink.clone());

    Rig {
        ledger,
        engine,
        sink,
        device_keys: KeyPair::generate(),
    }
}

#[tokio::test]
async fn test_offline_round_trip_settles_and_rejects_replay() {
    let rig = rig();
    let mut events = rig.sink.subscribe();

    let device = rig
        .engine
        .register_device("alice", &rig.device_keys.public_key_hex(), "hw-1", "os-14")
        .unwrap();

    let (purse, certificate) = rig.engine.fund_purse("alice", &device.id, 100).await.unwrap();
    assert_eq!(purse.balance, 100);
    assert!(offline_engine::crypto::verify_intent(
        &rig.engine.issuer_public_key(),
        certificate.message().as_bytes(),
        &certificate.signature
    ));

    let signed = PaymentIntent {
        payer_id: device.id.clone(),
        payee_id: "bob".to_string(),
        amount: 50,
        counter: 1,
        nonce: "nonce-1".to_string(),
    }
    .sign(&rig.device_keys);

    let report = rig.engine.reconcile(&device.id, &[signed.clone()]).await.unwrap();
    assert_eq!(report.valid_count, 1);
    assert_eq!(report.failed_count, 0);

    // the shadow debit and the ledger credit are symmetric
    assert_eq!(rig.engine.get_purse(&device.id).unwrap().balance, 50);
    assert_eq!(
        rig.ledger.get_wallet(&WalletId::new("wallet-bob")).unwrap().balance,
        50
    );
    assert_eq!(
        rig.ledger.get_wallet(&WalletId::new("wallet-alice")).unwrap().balance,
        950
    );
    assert!(rig.ledger.check_conservation().unwrap());

    // analytics saw the settled transfer and the batch summary
    let mut saw_transfer = false;
    let mut saw_batch = false;
    while let Ok(event) = events.try_recv() {
        match event {
            LedgerEvent::Transfer(tx) if tx.kind == TxKind::OfflineReconcile => {
                assert_eq!(tx.amount, 50);
                assert_eq!(tx.from, "wallet-alice");
                assert_eq!(tx.to, "wallet-bob");
                assert!(tx.signature.is_some());
                saw_transfer = true;
            }
            LedgerEvent::BatchReconcile(summary) => {
                assert_eq!(summary.batch_size, 1);
                assert_eq!(summary.success_count, 1);
                saw_batch = true;
            }
            _ => {}
        }
    }
    assert!(saw_transfer);
    assert!(saw_batch);

    // replaying the identical signed intent fails with a double-spend tag
    let replay = rig.engine.reconcile(&device.id, &[signed]).await.unwrap();
    assert_eq!(replay.valid_count, 0);
    assert_eq!(replay.failures, vec![(0, RejectReason::DoubleSpend)]);

    // balances unchanged by the replay
    assert_eq!(rig.engine.get_purse(&device.id).unwrap().balance, 50);
    assert_eq!(
        rig.ledger.get_wallet(&WalletId::new("wallet-bob")).unwrap().balance,
        50
    );
}

#[tokio::test]
async fn test_funding_cap_is_hard() {
    let rig = rig();
    let device = rig
        .engine
        .register_device("alice", &rig.device_keys.public_key_hex(), "hw-1", "os-14")
        .unwrap();

    rig.engine.fund_purse("alice", &device.id, 450).await.unwrap();
    let (purse, _) = rig.engine.fund_purse("alice", &device.id, 50).await.unwrap();
    assert_eq!(purse.balance, 500);

    let over = rig.engine.fund_purse("alice", &device.id, 1).await;
    assert!(matches!(
        over,
        Err(offline_engine::Error::BalanceLimitExceeded(_))
    ));
    assert_eq!(rig.engine.get_purse(&device.id).unwrap().balance, 500);
}

#[tokio::test]
async fn test_mixed_batch_isolates_failures() {
    let rig = rig();
    let device = rig
        .engine
        .register_device("alice", &rig.device_keys.public_key_hex(), "hw-1", "os-14")
        .unwrap();
    rig.engine.fund_purse("alice", &device.id, 120).await.unwrap();

    let good = PaymentIntent {
        payer_id: device.id.clone(),
        payee_id: "bob".to_string(),
        amount: 40,
        counter: 1,
        nonce: "nonce-1".to_string(),
    }
    .sign(&rig.device_keys);

    let over_cap = PaymentIntent {
        payer_id: device.id.clone(),
        payee_id: "bob".to_string(),
        amount: 51,
        counter: 2,
        nonce: "nonce-2".to_string(),
    }
    .sign(&rig.device_keys);

    let also_good = PaymentIntent {
        payer_id: device.id.clone(),
        payee_id: "bob".to_string(),
        amount: 30,
        counter: 3,
        nonce: "nonce-3".to_string(),
    }
    .sign(&rig.device_keys);

    let report = rig
        .engine
        .reconcile(&device.id, &[good, over_cap, also_good])
        .await
        .unwrap();

    assert_eq!(report.valid_count, 2);
    assert_eq!(report.failures, vec![(1, RejectReason::AmountExceeded)]);
    assert_eq!(rig.engine.get_purse(&device.id).unwrap().balance, 50);
    assert_eq!(
        rig.ledger.get_wallet(&WalletId::new("wallet-bob")).unwrap().balance,
        70
    );
    assert!(rig.ledger.check_conservation().unwrap());
}
