//! Property-based tests for balance invariants
//!
//! Random operation sequences run against the in-memory ledger store and a
//! plain integer model of the same accounts:
//! - Balances never go negative
//! - Conservation: enrolled - settled == Σ(balances) + Σ(pending)
//! - Rejected operations leave no trace in balances or the accounting log

use std::collections::HashMap;
use std::sync::Arc;

use balance_service::models::{EntryKind, OrderRequest};
use balance_service::{Amount, BalanceEngine, MemoryLedgerStore, OrderId, ServiceId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const USERS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Enroll { user: usize, cents: u64 },
    Transfer { from: usize, to: usize, cents: u64 },
    Reserve { user: usize, cents: u64 },
    Success { order: usize },
    Failed { order: usize },
}

/// Strategy for generating valid amounts (1 minor unit .. 500.00)
fn cents_strategy() -> impl Strategy<Value = u64> {
    1u64..50_000u64
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, cents_strategy()).prop_map(|(user, cents)| Op::Enroll { user, cents }),
        (0..USERS, 0..USERS, cents_strategy())
            .prop_map(|(from, to, cents)| Op::Transfer { from, to, cents }),
        (0..USERS, cents_strategy()).prop_map(|(user, cents)| Op::Reserve { user, cents }),
        (0usize..16).prop_map(|order| Op::Success { order }),
        (0usize..16).prop_map(|order| Op::Failed { order }),
    ]
}

fn amount(cents: u64) -> Amount {
    Amount::from_minor_units(cents).unwrap()
}

fn cents_of(amount: Amount) -> i64 {
    (amount.as_decimal() * Decimal::ONE_HUNDRED).to_i64().unwrap()
}

/// Integer mirror of the engine's bookkeeping
#[derive(Default)]
struct Model {
    balances: HashMap<usize, i64>,
    /// (request, still pending)
    orders: Vec<(OrderRequest, bool)>,
    enrolled: i64,
    settled: i64,
}

async fn run_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let store = MemoryLedgerStore::new();
    let engine = BalanceEngine::new(Arc::new(store.clone()));
    let users: Vec<UserId> = (0..USERS).map(|_| UserId::new_random()).collect();
    let service = ServiceId::new_random();
    let mut model = Model::default();

    for op in ops {
        match op {
            Op::Enroll { user, cents } => {
                let res = engine.enroll(users[user], amount(cents)).await;
                prop_assert!(res.is_ok());
                *model.balances.entry(user).or_default() += cents as i64;
                model.enrolled += cents as i64;
            }
            Op::Transfer { from, to, cents } => {
                let res = engine.transfer(users[from], users[to], amount(cents)).await;
                let sender = model.balances.get(&from).copied();
                let expect_ok = from != to
                    && sender.is_some_and(|b| b >= cents as i64)
                    && model.balances.contains_key(&to);
                prop_assert_eq!(res.is_ok(), expect_ok, "transfer {} -> {}", from, to);
                if expect_ok {
                    *model.balances.entry(from).or_default() -= cents as i64;
                    *model.balances.entry(to).or_default() += cents as i64;
                }
            }
            Op::Reserve { user, cents } => {
                let req = OrderRequest {
                    user_id: users[user],
                    service_id: service,
                    order_id: OrderId::new_random(),
                    service_name: "Delivery".to_string(),
                    amount: amount(cents),
                };
                let res = engine.reserve_order(req.clone()).await;
                let expect_ok = model
                    .balances
                    .get(&user)
                    .is_some_and(|b| *b >= cents as i64);
                prop_assert_eq!(res.is_ok(), expect_ok);
                if expect_ok {
                    *model.balances.entry(user).or_default() -= cents as i64;
                    model.orders.push((req, true));
                }
            }
            Op::Success { order } | Op::Failed { order } => {
                let Some((req, pending)) = model.orders.get(order).cloned() else {
                    continue;
                };
                let success = matches!(op, Op::Success { .. });
                let res = if success {
                    engine.settle_order_success(req.clone()).await.map(|_| ())
                } else {
                    engine.settle_order_failed(req.clone()).await.map(|_| ())
                };
                prop_assert_eq!(res.is_ok(), pending);
                if pending {
                    let cents = cents_of(req.amount);
                    if success {
                        model.settled += cents;
                    } else {
                        let idx = users.iter().position(|u| *u == req.user_id).unwrap();
                        *model.balances.entry(idx).or_default() += cents;
                    }
                    model.orders[order].1 = false;
                }
            }
        }
    }

    // Balances agree with the model and are never negative
    let mut total_balance = 0i64;
    for (idx, user) in users.iter().enumerate() {
        match model.balances.get(&idx) {
            Some(expected) => {
                let actual = cents_of(engine.get_balance(*user).await.unwrap().balance);
                prop_assert!(actual >= 0);
                prop_assert_eq!(actual, *expected);
                total_balance += actual;
            }
            None => prop_assert!(engine.get_balance(*user).await.is_err()),
        }
    }

    let pending: i64 = store
        .pending_orders()
        .await
        .iter()
        .map(|o| cents_of(o.amount))
        .sum();
    let model_pending: i64 = model
        .orders
        .iter()
        .filter(|(_, p)| *p)
        .map(|(r, _)| cents_of(r.amount))
        .sum();
    prop_assert_eq!(pending, model_pending);
    prop_assert_eq!(model.enrolled - model.settled, total_balance + pending);

    // The accounting log tells the same story
    let mut replenished = 0i64;
    let mut transferred = 0i64;
    let mut settled = 0i64;
    for entry in store.entries().await {
        let cents = cents_of(entry.amount);
        prop_assert!(cents > 0);
        match entry.kind {
            EntryKind::Replenished => replenished += cents,
            EntryKind::Transferred => transferred += cents,
            EntryKind::Settlement { .. } => settled += cents,
        }
    }
    prop_assert_eq!(replenished - transferred, model.enrolled);
    prop_assert_eq!(settled, model.settled);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_conservation_holds(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(run_ops(ops))?;
    }

    /// Property: an enrollment sequence sums exactly, with no rounding drift
    #[test]
    fn prop_enrollments_sum_exactly(amounts in prop::collection::vec(cents_strategy(), 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let engine = BalanceEngine::new(Arc::new(MemoryLedgerStore::new()));
            let user = UserId::new_random();
            for cents in &amounts {
                engine.enroll(user, amount(*cents)).await.unwrap();
            }
            let expected: u64 = amounts.iter().sum();
            let balance = engine.get_balance(user).await.unwrap().balance;
            prop_assert_eq!(balance, amount(expected));
            Ok(())
        })?;
    }
}
