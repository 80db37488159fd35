//! Balance handlers: lookup, enrollment, transfer

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{
    ApiJson, ApiQuery, ApiResult, EnrollRequest, MessageData, TransferRequest, UserIdQuery, ok,
};
use crate::models::User;

/// Current balance of a user
#[utoipa::path(
    get,
    path = "/balance",
    params(UserIdQuery),
    responses(
        (status = 200, description = "User balance", body = User, content_type = "application/json"),
        (status = 400, description = "Malformed user id"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal error")
    ),
    tag = "Balance"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserIdQuery>,
) -> ApiResult<User> {
    let user = state.engine.get_balance(query.id).await?;
    ok(user)
}

/// Credit funds, creating the user on first enrollment
#[utoipa::path(
    post,
    path = "/balance",
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Updated balance", body = User, content_type = "application/json"),
        (status = 400, description = "Invalid parameters"),
        (status = 500, description = "Internal error")
    ),
    tag = "Balance"
)]
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EnrollRequest>,
) -> ApiResult<User> {
    let amount = req.funds.to_amount()?;
    let user = state.engine.enroll(req.id, amount).await?;
    ok(user)
}

/// Move funds between two users
#[utoipa::path(
    post,
    path = "/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed", body = MessageData, content_type = "application/json"),
        (status = 400, description = "Invalid parameters or insufficient funds"),
        (status = 404, description = "Sender or recipient not found"),
        (status = 500, description = "Internal error")
    ),
    tag = "Balance"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<MessageData> {
    let amount = req.funds.to_amount()?;
    state
        .engine
        .transfer(req.sender_id, req.recipient_id, amount)
        .await?;
    ok(MessageData::new("Transfer completed"))
}
