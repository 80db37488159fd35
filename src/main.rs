//! Balance Service entry point
//!
//! Usage:
//!   balance-service [--env dev|prod] [--port 8080]
//!
//! Without a `postgres`/`postgres_url` section in the config the service
//! runs on the in-memory ledger store.

use std::sync::Arc;

use anyhow::{Context, Result};
use balance_service::config::AppConfig;
use balance_service::db::Database;
use balance_service::gateway::{self, state::AppState};
use balance_service::ledger::{LedgerStore, MemoryLedgerStore};
use balance_service::logging::init_logging;
use balance_service::report::{CsvReportDir, ReportArchive};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.postgres_options()? {
        Some(options) => {
            let db = Database::connect(options, config.max_connections())
                .await
                .context("Failed to connect to PostgreSQL")?;
            let store = db
                .into_ledger_store()
                .await
                .context("Failed to initialize ledger schema")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No PostgreSQL configured, balances are kept in memory only");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.override_port(port);
    }
    let _log_guard = init_logging(&config);

    tracing::info!(
        build = env!("BALANCE_SERVICE_BUILD"),
        "Starting Balance Service in {} mode",
        env
    );

    let store = open_store(&config).await?;
    tracing::info!(store = store.name(), "Ledger store ready");

    let archive: Arc<dyn ReportArchive> = Arc::new(CsvReportDir::new(&config.reports_dir));
    let state = Arc::new(AppState::new(store, archive, config.public_url()));

    gateway::run_server(&config.gateway.host, config.gateway.port, state)
        .await
        .context("Gateway stopped")?;
    Ok(())
}
