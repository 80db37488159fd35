//! Reporting handlers: monthly revenue CSV and user history

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiJson, ApiQuery, ApiResult, HistoryQuery, ReportCreatedData, ReportIdQuery,
    ReportRequest, ok,
};
use crate::models::HistoryEntry;

/// Generate the revenue report of one month
#[utoipa::path(
    post,
    path = "/report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report generated", body = ReportCreatedData, content_type = "application/json"),
        (status = 400, description = "Invalid year or month"),
        (status = 500, description = "Internal error")
    ),
    tag = "Report"
)]
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> ApiResult<ReportCreatedData> {
    let id = state
        .reporting
        .monthly_report(&req.year.into_text(), &req.month.into_text())
        .await?;
    ok(ReportCreatedData {
        id,
        url: state.report_url(id),
    })
}

/// Download a generated report
#[utoipa::path(
    get,
    path = "/report/csv",
    params(ReportIdQuery),
    responses(
        (status = 200, description = "Report rows `service;revenue`", body = String, content_type = "text/csv"),
        (status = 400, description = "Malformed report id"),
        (status = 404, description = "Report not found"),
        (status = 500, description = "Internal error")
    ),
    tag = "Report"
)]
pub async fn report_csv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ReportIdQuery>,
) -> Result<Response, ApiError> {
    let body = state.reporting.fetch_report(query.id).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response())
}

/// Ledger history of a user, largest amounts first
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "History rows", body = Vec<HistoryEntry>, content_type = "application/json"),
        (status = 400, description = "Invalid id, limit or offset"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal error")
    ),
    tag = "Report"
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let rows = state
        .reporting
        .history(query.id, query.limit, query.offset)
        .await?;
    ok(rows)
}
