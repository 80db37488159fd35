//! Ledger Store
//!
//! Durable storage for user balances, pending orders and the append-only
//! accounting log.
//!
//! # Transaction model
//!
//! Every mutation runs inside a [`LedgerTx`] obtained from
//! [`LedgerStore::begin`]:
//!
//! ```text
//! begin() ──▶ lock_user / lock_order ──▶ writes ──▶ commit()
//!                                          │
//!                                          └── drop without commit = rollback
//! ```
//!
//! # Safety Invariants
//!
//! 1. **All-or-nothing**: balance updates, ledger appends and order
//!    create/delete of one transaction commit together or not at all
//! 2. **Lock-before-check**: rows are read through `lock_*` so two
//!    concurrent debits of the same user are serialized
//! 3. **Append-only log**: accounting entries are never updated or deleted

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core_types::{OrderId, UserId};
use crate::models::{LedgerEntry, NewLedgerEntry, Order, Page, ReportMonth, ServiceRevenue, User};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique key already taken (user or pending order)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::Conflict(db_err.message().to_string());
        }
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backend for the balance engine
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Open a transaction. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    /// Committed snapshot of a user
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Committed snapshot of a pending order
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Settlement revenue within `month`, grouped by service name,
    /// ordered by total descending then service name
    async fn monthly_revenue(&self, month: ReportMonth) -> StoreResult<Vec<ServiceRevenue>>;

    /// Ledger entries of one user ordered by amount descending,
    /// then timestamp ascending, then insertion order
    async fn user_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<LedgerEntry>>;

    /// Liveness probe used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}

/// One unit of work against the store
#[async_trait]
pub trait LedgerTx: Send {
    /// Read a user and hold its row lock until the transaction ends
    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>>;

    /// Insert a new user unless the id exists; `true` when a row was created.
    /// A racing insert of the same id waits for the other transaction.
    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<bool>;

    /// Persist `balance` and `last_update` of an existing user
    async fn update_user_balance(&mut self, user: &User) -> StoreResult<()>;

    /// Append an accounting entry
    async fn append_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<()>;

    /// Create a pending order; `Conflict` if one with this id is pending
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;

    /// Read a pending order and hold its row lock
    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Remove a pending order
    async fn delete_order(&mut self, id: OrderId) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
