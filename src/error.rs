//! Engine Error Types
//!
//! The tagged result every balance and reporting operation returns.
//! The gateway is the only place these kinds are translated into responses.

use thiserror::Error;

use crate::ledger::StoreError;
use crate::models::ReportQueryError;
use crate::money::MoneyError;

/// Result of an engine operation
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced user, order or report does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input or mismatched order confirmation
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Storage or transport failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn user_not_found(id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("user {}", id))
    }

    pub fn order_not_found(id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("order {}", id))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Internal(e.to_string())
    }
}

impl From<MoneyError> for EngineError {
    fn from(e: MoneyError) -> Self {
        EngineError::BadRequest(e.to_string())
    }
}

impl From<ReportQueryError> for EngineError {
    fn from(e: ReportQueryError) -> Self {
        EngineError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        assert_eq!(
            EngineError::user_not_found("u1").to_string(),
            "Not found: user u1"
        );
        assert_eq!(
            EngineError::order_not_found("o1"),
            EngineError::NotFound("order o1".into())
        );
    }

    #[test]
    fn test_store_errors_become_internal() {
        let err: EngineError = StoreError::Database("connection reset".into()).into();
        assert_eq!(
            err,
            EngineError::Internal("Database error: connection reset".into())
        );
    }
}
