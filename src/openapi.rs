//! OpenAPI document for the payment HTTP surface, served as plain JSON at
//! `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::handlers::payments::{
    InitiatePaymentRequest, InitiatePaymentResponse, PaymentStatusResponse, RefundPaymentRequest,
    ShippedRequest,
};
use crate::models::OrderType;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MultiSafepay Bridge API",
        description = "Payment initiation, gateway notifications, refunds and shipment updates for the MultiSafepay gateway"
    ),
    paths(
        crate::handlers::payments::initiate_payment,
        crate::handlers::payments::payment_status,
        crate::handlers::payments::mark_shipped,
        crate::handlers::payments::refund_payment,
        crate::handlers::payments::list_issuers,
        crate::handlers::notifications::payment_notification,
    ),
    components(schemas(
        InitiatePaymentRequest,
        InitiatePaymentResponse,
        PaymentStatusResponse,
        ShippedRequest,
        RefundPaymentRequest,
        OrderType,
        ErrorResponse,
    )),
    tags(
        (name = "Payments", description = "Payment lifecycle operations"),
        (name = "Notifications", description = "Inbound gateway webhooks")
    )
)]
pub struct ApiDoc;
