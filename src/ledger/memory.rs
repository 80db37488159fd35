//! In-memory ledger store
//!
//! A transaction takes the store-wide lock and works on a private copy of
//! the state; `commit` publishes the copy, dropping the transaction
//! discards it. Every mutation is therefore fully serialized and readers
//! only ever observe committed state.
//!
//! Reads on the store itself wait for the lock, so a caller holding an
//! open transaction must not read through the store in the same task.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};
use crate::core_types::{OrderId, UserId};
use crate::models::{LedgerEntry, NewLedgerEntry, Order, Page, ReportMonth, ServiceRevenue, User};
use crate::money::Amount;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    entries: Vec<LedgerEntry>,
}

/// Process-local ledger store
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail (fault injection)
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Full accounting log in insertion order
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.lock().await.entries.clone()
    }

    /// All pending orders
    pub async fn pending_orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryLedgerTx {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn monthly_revenue(&self, month: ReportMonth) -> StoreResult<Vec<ServiceRevenue>> {
        let state = self.state.lock().await;

        let mut totals: BTreeMap<&str, Amount> = BTreeMap::new();
        for entry in &state.entries {
            if entry.kind.service_id().is_none() || !month.contains(entry.created_at) {
                continue;
            }
            let total = totals.entry(entry.kind.label()).or_insert(Amount::ZERO);
            *total = total
                .checked_add(entry.amount)
                .ok_or_else(|| StoreError::Database("Revenue overflow".to_string()))?;
        }

        let mut report: Vec<ServiceRevenue> = totals
            .into_iter()
            .map(|(name, revenue)| ServiceRevenue {
                service_name: name.to_string(),
                revenue,
            })
            .collect();
        // BTreeMap yields names ascending; stable sort keeps that as tie-break
        report.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        Ok(report)
    }

    async fn user_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.lock().await;

        let mut rows: Vec<&LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        Ok(rows
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open in-memory transaction
pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<bool> {
        if self.working.users.contains_key(&user.id) {
            return Ok(false);
        }
        self.working.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn update_user_balance(&mut self, user: &User) -> StoreResult<()> {
        let stored = self
            .working
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::Database(format!("User {} disappeared", user.id)))?;
        stored.balance = user.balance;
        stored.last_update = user.last_update;
        Ok(())
    }

    async fn append_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<()> {
        if !self.working.users.contains_key(&entry.user_id) {
            return Err(StoreError::Database(format!(
                "accounting entry references unknown user {}",
                entry.user_id
            )));
        }
        let id = self.working.entries.len() as i64 + 1;
        self.working.entries.push(LedgerEntry {
            id,
            user_id: entry.user_id,
            kind: entry.kind.clone(),
            amount: entry.amount,
            created_at: entry.created_at,
        });
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        if self.working.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {} already pending", order.id)));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn delete_order(&mut self, id: OrderId) -> StoreResult<()> {
        self.working
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::Database(format!("Order {} disappeared", id)))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fail_commit {
            return Err(StoreError::Database("injected commit failure".to_string()));
        }
        let MemoryLedgerTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
