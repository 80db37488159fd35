//! Order lifecycle handlers: reserve, confirm success, confirm failure

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResult, MessageData, OrderBody, ok};
use crate::models::User;

/// Reserve funds for an order
///
/// The cost is debited immediately and the order stays pending until it is
/// confirmed through `/order/success` or `/order/failed`.
#[utoipa::path(
    post,
    path = "/order",
    request_body = OrderBody,
    responses(
        (status = 200, description = "Funds reserved", body = MessageData, content_type = "application/json"),
        (status = 400, description = "Invalid parameters, duplicate order or insufficient funds"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal error")
    ),
    tag = "Order"
)]
pub async fn reserve_order(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<OrderBody>,
) -> ApiResult<MessageData> {
    let order = state.engine.reserve_order(body.into_request()?).await?;
    ok(MessageData::new(format!("Order {} reserved", order.id)))
}

/// Confirm a pending order as delivered
#[utoipa::path(
    post,
    path = "/order/success",
    request_body = OrderBody,
    responses(
        (status = 200, description = "Order settled", body = MessageData, content_type = "application/json"),
        (status = 400, description = "Fields do not match the pending order"),
        (status = 404, description = "Order not pending"),
        (status = 500, description = "Internal error")
    ),
    tag = "Order"
)]
pub async fn order_success(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<OrderBody>,
) -> ApiResult<MessageData> {
    let req = body.into_request()?;
    let order_id = req.order_id;
    state.engine.settle_order_success(req).await?;
    ok(MessageData::new(format!("Order {} settled", order_id)))
}

/// Confirm a pending order as failed, returning the funds
#[utoipa::path(
    post,
    path = "/order/failed",
    request_body = OrderBody,
    responses(
        (status = 200, description = "Order released, funds returned", body = User, content_type = "application/json"),
        (status = 400, description = "Fields do not match the pending order"),
        (status = 404, description = "Order not pending"),
        (status = 500, description = "Internal error")
    ),
    tag = "Order"
)]
pub async fn order_failed(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<OrderBody>,
) -> ApiResult<User> {
    let user = state.engine.settle_order_failed(body.into_request()?).await?;
    ok(user)
}
