//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    EnrollRequest, MessageData, OrderBody, ReportCreatedData, ReportRequest, TransferRequest,
};
use crate::models::{HistoryEntry, User};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Balance Service API",
        version = "1.0.0",
        description = "User balances, transfers, reserve/settle order lifecycle and monthly revenue reports.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::balance::get_balance,
        crate::gateway::handlers::balance::enroll,
        crate::gateway::handlers::balance::transfer,
        crate::gateway::handlers::order::reserve_order,
        crate::gateway::handlers::order::order_success,
        crate::gateway::handlers::order::order_failed,
        crate::gateway::handlers::report::create_report,
        crate::gateway::handlers::report::report_csv,
        crate::gateway::handlers::report::history,
    ),
    components(
        schemas(
            HealthResponse,
            User,
            HistoryEntry,
            MessageData,
            ReportCreatedData,
            EnrollRequest,
            TransferRequest,
            OrderBody,
            ReportRequest,
        )
    ),
    tags(
        (name = "Balance", description = "Balance lookup, enrollment and transfers"),
        (name = "Order", description = "Reserve funds and confirm order outcomes"),
        (name = "Report", description = "Monthly revenue reports and user history"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
