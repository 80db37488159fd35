//! PostgreSQL ledger store
//!
//! Row locks (`SELECT ... FOR UPDATE`) serialize concurrent mutations of
//! the same user or order. Rollback is sqlx's drop-without-commit.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};
use crate::core_types::{OrderId, ServiceId, UserId};
use crate::models::{
    EntryKind, LedgerEntry, NewLedgerEntry, Order, Page, ReportMonth, ServiceRevenue, User,
};
use crate::money::Amount;

const USER_COLUMNS: &str = "id, balance, created_at, last_update";
const ORDER_COLUMNS: &str = "id, user_id, service_id, service_name, amount, created_at";
const ENTRY_COLUMNS: &str = "id, user_id, order_id, service_id, service_name, amount, created_at";

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        balance: row.try_get("balance")?,
        created_at: row.try_get("created_at")?,
        last_update: row.try_get("last_update")?,
    })
}

fn row_to_order(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        service_id: row.try_get("service_id")?,
        service_name: row.try_get("service_name")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_entry(row: &PgRow) -> StoreResult<LedgerEntry> {
    let id: i64 = row.try_get("id")?;
    let service_id: Option<ServiceId> = row.try_get("service_id")?;
    let order_id: Option<OrderId> = row.try_get("order_id")?;
    let label: String = row.try_get("service_name")?;

    let kind = EntryKind::from_columns(label, service_id, order_id)
        .ok_or_else(|| StoreError::Database(format!("Unrecognized accounting row {}", id)))?;

    Ok(LedgerEntry {
        id,
        user_id: row.try_get("user_id")?,
        kind,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn monthly_revenue(&self, month: ReportMonth) -> StoreResult<Vec<ServiceRevenue>> {
        let rows = sqlx::query(
            r#"
            SELECT service_name, SUM(amount) AS revenue
            FROM accounting
            WHERE service_id IS NOT NULL
              AND created_at >= $1 AND created_at < $2
            GROUP BY service_name
            ORDER BY revenue DESC, service_name ASC
            "#,
        )
        .bind(month.start())
        .bind(month.end())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<ServiceRevenue> {
                let revenue: Decimal = row.try_get("revenue")?;
                Ok(ServiceRevenue {
                    service_name: row.try_get("service_name")?,
                    revenue: Amount::new(revenue)
                        .map_err(|e| StoreError::Database(format!("Bad revenue sum: {}", e)))?,
                })
            })
            .collect()
    }

    async fn user_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounting WHERE user_id = $1 \
             ORDER BY amount DESC, created_at ASC, id ASC \
             LIMIT $2 OFFSET $3",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert_user_if_absent(&mut self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, balance, created_at, last_update)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(user.balance)
        .bind(user.created_at)
        .bind(user.last_update)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_user_balance(&mut self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET balance = $1, last_update = $2 WHERE id = $3")
            .bind(user.balance)
            .bind(user.last_update)
            .bind(user.id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(format!("User {} disappeared", user.id)));
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounting (user_id, order_id, service_id, service_name, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.kind.order_id())
        .bind(entry.kind.service_id())
        .bind(entry.kind.label())
        .bind(entry.amount)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, service_id, service_name, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.service_id)
        .bind(&order.service_name)
        .bind(order.amount)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn delete_order(&mut self, id: OrderId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(format!("Order {} disappeared", id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
