//! PostgreSQL schema for the ledger store
//!
//! Statements are idempotent and run on every startup.

use sqlx::PgPool;

use super::StoreResult;

pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          UUID PRIMARY KEY,
    balance     NUMERIC(20, 2) NOT NULL CHECK (balance >= 0),
    created_at  TIMESTAMPTZ NOT NULL,
    last_update TIMESTAMPTZ NOT NULL
)"#;

pub const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id           UUID PRIMARY KEY,
    user_id      UUID NOT NULL REFERENCES users (id),
    service_id   UUID NOT NULL,
    service_name TEXT NOT NULL CHECK (service_name <> ''),
    amount       NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    created_at   TIMESTAMPTZ NOT NULL
)"#;

pub const CREATE_ACCOUNTING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounting (
    id           BIGSERIAL PRIMARY KEY,
    user_id      UUID NOT NULL REFERENCES users (id),
    order_id     UUID,
    service_id   UUID,
    service_name TEXT NOT NULL,
    amount       NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    created_at   TIMESTAMPTZ NOT NULL
)"#;

pub const CREATE_ACCOUNTING_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS accounting_user_idx ON accounting (user_id)";

pub const CREATE_ACCOUNTING_REVENUE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS accounting_revenue_idx \
     ON accounting (created_at) WHERE service_id IS NOT NULL";

const STATEMENTS: [(&str, &str); 5] = [
    ("users", CREATE_USERS_TABLE),
    ("orders", CREATE_ORDERS_TABLE),
    ("accounting", CREATE_ACCOUNTING_TABLE),
    ("accounting_user_idx", CREATE_ACCOUNTING_USER_INDEX),
    ("accounting_revenue_idx", CREATE_ACCOUNTING_REVENUE_INDEX),
];

/// Create tables and indexes if they do not exist yet
pub async fn init_schema(pool: &PgPool) -> StoreResult<()> {
    tracing::info!("Initializing ledger schema...");

    for (name, sql) in STATEMENTS {
        sqlx::query(sql).execute(pool).await.map_err(|e| {
            tracing::error!("Failed to create {}: {}", name, e);
            e
        })?;
    }

    tracing::info!("Ledger schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_idempotent() {
        for (name, sql) in STATEMENTS {
            assert!(sql.contains("IF NOT EXISTS"), "{} must be re-runnable", name);
        }
    }

    #[test]
    fn test_balance_cannot_go_negative_at_db_level() {
        assert!(CREATE_USERS_TABLE.contains("CHECK (balance >= 0)"));
    }
}
