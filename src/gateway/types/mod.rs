//! Gateway types module
//!
//! ## Input Types
//! - [`StrictDecimal`]: Format-validated decimal for API input
//! - [`ApiJson`] / [`ApiQuery`]: extractors rejecting with the JSON envelope
//! - Request DTOs per endpoint
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Error envelope with HTTP status

pub mod money;
pub mod request;
pub mod response;

// Re-export commonly used types at module root
pub use money::StrictDecimal;
pub use request::{
    ApiJson, ApiQuery, DatePart, EnrollRequest, HistoryQuery, OrderBody, ReportIdQuery,
    ReportRequest, TransferRequest, UserIdQuery,
};
pub use response::{
    ApiError, ApiResponse, ApiResult, MessageData, ReportCreatedData, error_codes, ok,
};
