//! Request DTOs and extractors
//!
//! IDs decode straight into their newtypes, so a malformed UUID never
//! reaches a handler. `ApiJson` / `ApiQuery` replace axum's plain-text
//! rejections with the JSON envelope.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use utoipa::{IntoParams, ToSchema};

use super::money::StrictDecimal;
use super::response::ApiError;
use crate::core_types::{OrderId, ReportId, ServiceId, UserId};
use crate::models::OrderRequest;

// ============================================================================
// Extractors
// ============================================================================

/// JSON body extractor whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| {
                ApiError::bad_request(format!("Invalid JSON: {}", e.body_text()))
            })?;
        Ok(ApiJson(value))
    }
}

/// Query string extractor whose rejection is an [`ApiError`]
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| {
                ApiError::bad_request(format!("Invalid query: {}", e.body_text()))
            })?;
        Ok(ApiQuery(value))
    }
}

// ============================================================================
// Balance
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserIdQuery {
    /// User UUID
    #[param(value_type = String, format = Uuid)]
    pub id: UserId,
}

/// Enrollment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollRequest {
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    /// Amount to credit, number or decimal string
    #[schema(value_type = String, example = "100.00")]
    pub funds: StrictDecimal,
}

/// Transfer request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(value_type = String, format = Uuid)]
    pub sender_id: UserId,
    #[schema(value_type = String, format = Uuid)]
    pub recipient_id: UserId,
    #[schema(value_type = String, example = "40.00")]
    pub funds: StrictDecimal,
}

// ============================================================================
// Orders
// ============================================================================

/// Order body shared by reserve and both confirmations
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderBody {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    #[schema(value_type = String, format = Uuid)]
    pub service_id: ServiceId,
    #[schema(example = "Widget")]
    pub service_name: String,
    #[schema(value_type = String, format = Uuid)]
    pub order_id: OrderId,
    #[schema(value_type = String, example = "50.00")]
    pub cost: StrictDecimal,
}

impl OrderBody {
    pub fn into_request(self) -> Result<OrderRequest, ApiError> {
        if self.service_name.trim().is_empty() {
            return Err(ApiError::bad_request("service_name must not be empty"));
        }
        Ok(OrderRequest {
            user_id: self.user_id,
            service_id: self.service_id,
            order_id: self.order_id,
            service_name: self.service_name,
            amount: self.cost.to_amount()?,
        })
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Year or month given either as a string or as a number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DatePart {
    Text(String),
    Number(u32),
}

impl DatePart {
    pub fn into_text(self) -> String {
        match self {
            DatePart::Text(s) => s,
            DatePart::Number(n) => n.to_string(),
        }
    }
}

/// Monthly report request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportRequest {
    /// Four-digit year
    #[schema(value_type = String, example = "2022")]
    pub year: DatePart,
    /// Month 1-12, "5" and "05" are equivalent
    #[schema(value_type = String, example = "05")]
    pub month: DatePart,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportIdQuery {
    /// Report handle returned by POST /report
    #[param(value_type = String, format = Uuid)]
    pub id: ReportId,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// User UUID
    #[param(value_type = String, format = Uuid)]
    pub id: UserId,
    /// Page size, must be positive
    pub limit: i64,
    /// Rows to skip, must not be negative
    pub offset: i64,
}
