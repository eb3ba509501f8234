//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify the critical invariants:
//! - Conservation: Σ balances == Σ issued − Σ redeemed at every point
//! - Non-negativity: no operation leaves a balance below zero
//! - Tier enforcement at the exact boundary

use ledger_core::{Ledger, LedgerConfig, MemoryStore, Role, WalletId};
use proptest::prelude::*;
use risk_policy::{Tier, TierLimits};
use std::collections::HashMap;
use std::sync::Arc;

const WALLETS: usize = 3;

/// One step of a random operation sequence
#[derive(Debug, Clone)]
enum Op {
    Issue { to: usize, amount: u64 },
    Redeem { from: usize, amount: u64 },
    Transfer { from: usize, to: usize, amount: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..WALLETS, 1..5_000u64).prop_map(|(to, amount)| Op::Issue { to, amount }),
        (0..WALLETS, 1..5_000u64).prop_map(|(from, amount)| Op::Redeem { from, amount }),
        (0..WALLETS, 0..WALLETS, 1..5_000u64)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
    ]
}

fn wallet(index: usize) -> WalletId {
    WalletId::new(format!("wallet-{index}"))
}

fn ledger_with_wallets() -> Ledger {
    let ledger = Ledger::new(Arc::new(MemoryStore::new()), LedgerConfig::default());
    for index in 0..WALLETS {
        ledger
            .create_wallet(wallet(index), format!("owner-{index}"), "bank-1", Tier::Tier2)
            .unwrap();
    }
    ledger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: conservation holds after every single operation, and the
    /// ledger state matches an independently tracked model.
    #[test]
    fn prop_conservation(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let ledger = ledger_with_wallets();
        let mut model = [0u64; WALLETS];
        let mut minted: u64 = 0;
        let mut redeemed: u64 = 0;

        for op in ops {
            match op {
                Op::Issue { to, amount } => {
                    if ledger.issue(Role::CentralBank, &wallet(to), amount).is_ok() {
                        model[to] += amount;
                        minted += amount;
                    }
                }
                Op::Redeem { from, amount } => {
                    if ledger.redeem(Role::CentralBank, &wallet(from), amount).is_ok() {
                        model[from] -= amount;
                        redeemed += amount;
                    }
                }
                Op::Transfer { from, to, amount } => {
                    if ledger.transfer(&wallet(from), &wallet(to), amount).is_ok() {
                        model[from] -= amount;
                        model[to] += amount;
                    }
                }
            }

            prop_assert!(ledger.check_conservation().unwrap());
            prop_assert_eq!(ledger.get_total_supply().unwrap(), minted - redeemed);
        }

        for (index, expected) in model.iter().enumerate() {
            prop_assert_eq!(ledger.get_wallet(&wallet(index)).unwrap().balance, *expected);
        }
    }

    /// Property: a transfer one unit above the sender's tier limit always
    /// fails, and one exactly at the limit always succeeds given balance.
    #[test]
    fn prop_tier_boundary(limit in 1..10_000u64, over in 1..100u64) {
        let config = LedgerConfig {
            tier_limits: TierLimits::new(HashMap::from([(Tier::Tier0, limit)])),
            ..Default::default()
        };
        let ledger = Ledger::new(Arc::new(MemoryStore::new()), config);
        ledger
            .create_wallet(WalletId::new("sender"), "alice", "bank-1", Tier::Tier0)
            .unwrap();
        ledger
            .create_wallet(WalletId::new("receiver"), "bob", "bank-1", Tier::Tier0)
            .unwrap();
        // enough balance that the boundary check is what decides both calls
        ledger
            .issue(
                Role::CentralBank,
                &WalletId::new("sender"),
                limit.saturating_mul(2).saturating_add(over),
            )
            .unwrap();

        prop_assert!(ledger
            .transfer(&WalletId::new("sender"), &WalletId::new("receiver"), limit)
            .is_ok());
        prop_assert!(matches!(
            ledger.transfer(
                &WalletId::new("sender"),
                &WalletId::new("receiver"),
                limit.saturating_add(over)
            ),
            Err(ledger_core::Error::LimitExceeded(_))
        ));
    }

    /// Property: redeeming more than the balance never succeeds and never
    /// mutates state (balances are unsigned, so underflow is unrepresentable).
    #[test]
    fn prop_redeem_never_overdraws(balance in 0..1_000u64, extra in 1..1_000u64) {
        let ledger = ledger_with_wallets();
        if balance > 0 {
            ledger.issue(Role::CentralBank, &wallet(0), balance).unwrap();
        }

        let result = ledger.redeem(Role::CentralBank, &wallet(0), balance + extra);
        prop_assert!(result.is_err());
        prop_assert_eq!(ledger.get_wallet(&wallet(0)).unwrap().balance, balance);
        prop_assert!(ledger.check_conservation().unwrap());
    }
}
