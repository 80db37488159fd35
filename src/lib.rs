//! Balance Service
//!
//! Per-user balances, transfers, a reserve → settle order lifecycle and
//! monthly revenue reporting over an append-only accounting log.
//!
//! # Modules
//!
//! - [`core_types`] - UUID newtypes (UserId, OrderId, ServiceId, ReportId)
//! - [`money`] - Fixed-point `Amount`
//! - [`models`] - Users, pending orders, ledger entries, report views
//! - [`error`] - Engine result kinds
//! - [`ledger`] - Transactional Ledger Store (PostgreSQL and in-memory)
//! - [`engine`] - Balance Engine
//! - [`report`] - Reporting Engine and CSV report archive
//! - [`gateway`] - HTTP gateway (axum) with OpenAPI docs
//! - [`config`] / [`logging`] / [`db`] - Service wiring

// Core types - must be first!
pub mod core_types;

pub mod error;
pub mod models;
pub mod money;

// Storage and business logic
pub mod engine;
pub mod ledger;
pub mod report;

// Service wiring
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use core_types::{OrderId, ReportId, ServiceId, UserId};
pub use engine::BalanceEngine;
pub use error::{EngineError, EngineResult};
pub use ledger::{LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore, StoreError};
pub use models::{HistoryEntry, LedgerEntry, Order, OrderRequest, ServiceRevenue, User};
pub use money::Amount;
pub use report::{CsvReportDir, ReportArchive, ReportingEngine};
