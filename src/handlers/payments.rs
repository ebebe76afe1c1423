use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::OrderType;
use crate::services::order_request::PaymentFormData;
use crate::services::payments::InitiatePayment;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "gateway_code must not be empty"))]
    pub gateway_code: String,
    /// Payment flow; defaults to redirect. An active token or a direct
    /// payload forces direct regardless of this field.
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub issuer_id: Option<String>,
    #[serde(default)]
    pub tokenize: bool,
    #[serde(default)]
    pub active_token: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub order_id: String,
    pub transaction_id: Uuid,
    pub payment_url: Option<String>,
}

// POST /api/v1/payments
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 201, description = "Payment initiated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or transaction not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway rejected the request", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let initiated = state
        .services
        .payments
        .initiate_payment(InitiatePayment {
            order_id: request.order_id,
            gateway_code: request.gateway_code,
            order_type: request.order_type,
            form: PaymentFormData {
                tokenize: request.tokenize,
                active_token: request.active_token,
                payload: request.payload,
                issuer_id: request.issuer_id,
            },
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InitiatePaymentResponse {
            order_id: initiated.order_id,
            transaction_id: initiated.transaction_id,
            payment_url: initiated.payment_url,
        })),
    ))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    pub status: Option<String>,
    /// Concrete method the shopper paid with, as reported by the gateway
    pub payment_type: Option<String>,
}

// GET /api/v1/payments/{transaction_id}
#[utoipa::path(
    get,
    path = "/api/v1/payments/{transaction_id}",
    responses(
        (status = 200, description = "Gateway-side payment status"),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let data = state.services.payments.payment_status(transaction_id).await?;

    Ok(Json(ApiResponse::success(PaymentStatusResponse {
        order_id: data.order_id,
        status: data.status,
        payment_type: data.payment_details.and_then(|d| d.payment_type),
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippedRequest {
    #[serde(default)]
    pub tracking_code: Option<String>,
}

// POST /api/v1/payments/{transaction_id}/shipped
#[utoipa::path(
    post,
    path = "/api/v1/payments/{transaction_id}/shipped",
    request_body = ShippedRequest,
    responses(
        (status = 202, description = "Shipment reported to the gateway"),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway rejected the update", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn mark_shipped(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<ShippedRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .payments
        .notify_shipped(transaction_id, request.tracking_code)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(()))))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefundPaymentRequest {
    /// Omit for a full refund of the transaction amount
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

// POST /api/v1/payments/{transaction_id}/refund
#[utoipa::path(
    post,
    path = "/api/v1/payments/{transaction_id}/refund",
    request_body = RefundPaymentRequest,
    responses(
        (status = 202, description = "Refund requested at the gateway"),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<RefundPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .payments
        .refund(transaction_id, request.amount, request.description)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(()))))
}

#[derive(Debug, Deserialize)]
pub struct IssuerQuery {
    /// Sales channel whose gateway credentials to use; the global default
    /// applies when omitted
    #[serde(default)]
    pub channel: Option<String>,
}

// GET /api/v1/payments/issuers/{gateway}
#[utoipa::path(
    get,
    path = "/api/v1/payments/issuers/{gateway}",
    responses(
        (status = 200, description = "Issuer list for the gateway code"),
        (status = 502, description = "Gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn list_issuers(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Query(query): Query<IssuerQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let channel = query.channel.unwrap_or_default();
    let issuers = state
        .services
        .payments
        .list_issuers(&channel, &gateway)
        .await?;

    let issuers: Vec<serde_json::Value> = issuers
        .into_iter()
        .map(|i| serde_json::json!({ "code": i.code, "description": i.description }))
        .collect();

    Ok(Json(ApiResponse::success(issuers)))
}
