//! Database connection management

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

use crate::ledger::schema::init_schema;
use crate::ledger::{PgLedgerStore, StoreResult};

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        tracing::info!(max_connections, "PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Create the ledger tables if needed and hand the pool to a store
    pub async fn into_ledger_store(self) -> StoreResult<PgLedgerStore> {
        init_schema(&self.pool).await?;
        Ok(PgLedgerStore::new(self.pool))
    }
}
