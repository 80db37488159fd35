//! Health check handler

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Ledger store backend
    #[schema(example = "postgres")]
    pub store: &'static str,
    /// Build revision
    #[schema(example = "3f2a9c1")]
    pub build: &'static str,
}

/// Health check endpoint
///
/// Pings the ledger store. Failure details are logged, never returned.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, store, build}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let store = state.engine.store();

    if let Err(e) = store.ping().await {
        tracing::error!("[HEALTH] {} store ping failed: {}", store.name(), e);
        return Err(ApiError::service_unavailable("unavailable"));
    }

    ok(HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
        store: store.name(),
        build: env!("BALANCE_SERVICE_BUILD"),
    })
}
