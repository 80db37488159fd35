//! HTTP handlers, one submodule per resource

pub mod balance;
pub mod health;
pub mod order;
pub mod report;

pub use balance::{enroll, get_balance, transfer};
pub use health::{HealthResponse, health_check};
pub use order::{order_failed, order_success, reserve_order};
pub use report::{create_report, history, report_csv};

