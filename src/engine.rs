//! Balance Engine
//!
//! Business rules for enrollment, transfers and the reserve → settle order
//! lifecycle. The engine keeps no state between calls: every operation
//! opens one [`LedgerTx`], re-reads the rows it needs under lock, computes
//! the new state and commits. Any early return drops the transaction,
//! which rolls it back.
//!
//! ```text
//! reserve_order ──▶ [pending] ──┬── settle_order_success ──▶ ledger entry (revenue)
//!   (debit user)                └── settle_order_failed  ──▶ credit user back
//! ```
//!
//! Financial mutations are never retried here; a storage failure surfaces
//! as [`EngineError::Internal`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::core_types::{OrderId, UserId};
use crate::error::{EngineError, EngineResult};
use crate::ledger::{LedgerStore, LedgerTx, StoreError};
use crate::models::{NewLedgerEntry, Order, OrderRequest, User};
use crate::money::Amount;

/// Stateless balance engine over a transactional [`LedgerStore`]
#[derive(Clone)]
pub struct BalanceEngine {
    store: Arc<dyn LedgerStore>,
}

fn log_failure(err: &EngineError) {
    match err {
        EngineError::Internal(msg) => error!(error = %msg, "Balance operation failed"),
        other => warn!(error = %other, "Balance operation rejected"),
    }
}

fn require_positive(amount: Amount) -> EngineResult<()> {
    if amount.is_zero() {
        return Err(EngineError::BadRequest(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_order(req: &OrderRequest) -> EngineResult<()> {
    require_positive(req.amount)?;
    if req.service_name.trim().is_empty() {
        return Err(EngineError::BadRequest(
            "service_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl BalanceEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Committed snapshot of a user
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_balance(&self, user_id: UserId) -> EngineResult<User> {
        let user = match self.store.get_user(user_id).await {
            Ok(found) => found.ok_or_else(|| EngineError::user_not_found(user_id)),
            Err(e) => Err(e.into()),
        };
        user.inspect_err(log_failure)
    }

    /// Credit `amount`, creating the user on first enrollment.
    ///
    /// Exactly one "Replenished" entry is written in both cases.
    #[instrument(skip(self), fields(user_id = %user_id, amount = %amount))]
    pub async fn enroll(&self, user_id: UserId, amount: Amount) -> EngineResult<User> {
        self.enroll_in_tx(user_id, amount)
            .await
            .inspect_err(log_failure)
    }

    async fn enroll_in_tx(&self, user_id: UserId, amount: Amount) -> EngineResult<User> {
        require_positive(amount)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let fresh = User::new(user_id, amount, now);
        let user = if tx.insert_user_if_absent(&fresh).await? {
            debug!("First enrollment, created user");
            fresh
        } else {
            // Existing row, or one a concurrent first enrollment just committed
            let mut user = tx.lock_user(user_id).await?.ok_or_else(|| {
                EngineError::Internal(format!("user {} vanished during enrollment", user_id))
            })?;
            user.balance = user
                .balance
                .checked_add(amount)
                .ok_or_else(|| EngineError::BadRequest("balance overflow".to_string()))?;
            user.last_update = now;
            tx.update_user_balance(&user).await?;
            user
        };

        tx.append_entry(&NewLedgerEntry::replenished(user_id, amount, now))
            .await?;
        tx.commit().await?;

        info!(balance = %user.balance, "Enrolled");
        Ok(user)
    }

    /// Move `amount` from sender to recipient as one atomic unit
    #[instrument(skip(self), fields(sender_id = %sender_id, recipient_id = %recipient_id, amount = %amount))]
    pub async fn transfer(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        amount: Amount,
    ) -> EngineResult<()> {
        self.transfer_in_tx(sender_id, recipient_id, amount)
            .await
            .inspect_err(log_failure)
    }

    async fn transfer_in_tx(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        amount: Amount,
    ) -> EngineResult<()> {
        require_positive(amount)?;
        if sender_id == recipient_id {
            return Err(EngineError::BadRequest(
                "sender and recipient must differ".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        // Lock in ascending id order so opposing transfers cannot deadlock
        let (sender, recipient) = if sender_id < recipient_id {
            let sender = tx.lock_user(sender_id).await?;
            let recipient = tx.lock_user(recipient_id).await?;
            (sender, recipient)
        } else {
            let recipient = tx.lock_user(recipient_id).await?;
            let sender = tx.lock_user(sender_id).await?;
            (sender, recipient)
        };

        let mut sender = sender.ok_or_else(|| EngineError::user_not_found(sender_id))?;
        let debited = sender
            .balance
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientFunds)?;
        let mut recipient = recipient.ok_or_else(|| EngineError::user_not_found(recipient_id))?;
        let credited = recipient
            .balance
            .checked_add(amount)
            .ok_or_else(|| EngineError::BadRequest("recipient balance overflow".to_string()))?;

        sender.balance = debited;
        sender.last_update = now;
        recipient.balance = credited;
        recipient.last_update = now;

        tx.update_user_balance(&sender).await?;
        tx.update_user_balance(&recipient).await?;
        tx.append_entry(&NewLedgerEntry::transferred(sender_id, amount, now))
            .await?;
        tx.append_entry(&NewLedgerEntry::replenished(recipient_id, amount, now))
            .await?;
        tx.commit().await?;

        info!("Transfer committed");
        Ok(())
    }

    /// Debit the user and record a pending order
    #[instrument(skip(self, req), fields(user_id = %req.user_id, order_id = %req.order_id, service_id = %req.service_id, amount = %req.amount))]
    pub async fn reserve_order(&self, req: OrderRequest) -> EngineResult<Order> {
        self.reserve_in_tx(req).await.inspect_err(log_failure)
    }

    async fn reserve_in_tx(&self, req: OrderRequest) -> EngineResult<Order> {
        validate_order(&req)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut user = tx
            .lock_user(req.user_id)
            .await?
            .ok_or_else(|| EngineError::user_not_found(req.user_id))?;

        if tx.lock_order(req.order_id).await?.is_some() {
            return Err(duplicate_order(req.order_id));
        }

        user.balance = user
            .balance
            .checked_sub(req.amount)
            .ok_or(EngineError::InsufficientFunds)?;
        user.last_update = now;

        let order = Order::from_request(&req, now);
        tx.update_user_balance(&user).await?;
        tx.insert_order(&order).await.map_err(|e| match e {
            StoreError::Conflict(_) => duplicate_order(order.id),
            other => other.into(),
        })?;
        tx.commit().await?;

        info!(balance = %user.balance, "Order reserved");
        Ok(order)
    }

    /// Recognize a reserved order as revenue
    #[instrument(skip(self, req), fields(user_id = %req.user_id, order_id = %req.order_id, service_id = %req.service_id))]
    pub async fn settle_order_success(&self, req: OrderRequest) -> EngineResult<()> {
        self.settle_success_in_tx(req)
            .await
            .inspect_err(log_failure)
    }

    async fn settle_success_in_tx(&self, req: OrderRequest) -> EngineResult<()> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let order = lock_matching_order(tx.as_mut(), &req).await?;

        tx.append_entry(&NewLedgerEntry::settlement(&order, now))
            .await?;
        tx.delete_order(order.id).await?;
        tx.commit().await?;

        info!(service_name = %order.service_name, "Order settled");
        Ok(())
    }

    /// Release a reserved order, returning the funds to the user
    #[instrument(skip(self, req), fields(user_id = %req.user_id, order_id = %req.order_id, service_id = %req.service_id))]
    pub async fn settle_order_failed(&self, req: OrderRequest) -> EngineResult<User> {
        self.settle_failed_in_tx(req)
            .await
            .inspect_err(log_failure)
    }

    async fn settle_failed_in_tx(&self, req: OrderRequest) -> EngineResult<User> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let order = lock_matching_order(tx.as_mut(), &req).await?;

        let mut user = tx.lock_user(order.user_id).await?.ok_or_else(|| {
            EngineError::Internal(format!("user {} of pending order missing", order.user_id))
        })?;
        user.balance = user
            .balance
            .checked_add(order.amount)
            .ok_or_else(|| EngineError::Internal("balance overflow on release".to_string()))?;
        user.last_update = now;

        tx.update_user_balance(&user).await?;
        tx.delete_order(order.id).await?;
        tx.commit().await?;

        info!(balance = %user.balance, "Order released");
        Ok(user)
    }
}

fn duplicate_order(id: OrderId) -> EngineError {
    EngineError::BadRequest(format!("order {} is already pending", id))
}

/// Lock the pending order and require an exact five-field match
async fn lock_matching_order(tx: &mut dyn LedgerTx, req: &OrderRequest) -> EngineResult<Order> {
    let order = tx
        .lock_order(req.order_id)
        .await?
        .ok_or_else(|| EngineError::order_not_found(req.order_id))?;

    if !order.matches(req) {
        return Err(EngineError::BadRequest(format!(
            "confirmation does not match pending order {}",
            req.order_id
        )));
    }
    Ok(order)
}
