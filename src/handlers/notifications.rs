use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use tracing::warn;

use crate::AppState;

/// Literal response bodies the gateway expects. Anything other than "OK"
/// makes the gateway retry the notification later.
const RESPONSE_OK: &str = "OK";
const RESPONSE_NG: &str = "NG";

// POST /api/v1/payments/notification
//
// Always answers 200 with "OK" or "NG": the two-token body is the contract,
// and an unexpected error must degrade to "NG" rather than a raw 5xx so the
// gateway's retry behavior stays intact.
#[utoipa::path(
    post,
    path = "/api/v1/payments/notification",
    request_body = String,
    responses(
        (status = 200, description = "Notification processed (body OK) or rejected (body NG)", body = String)
    ),
    tag = "Notifications"
)]
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let auth = headers
        .get("auth")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    match state
        .services
        .payments
        .process_notification(&body, auth)
        .await
    {
        Ok(()) => (StatusCode::OK, RESPONSE_OK),
        Err(e) => {
            warn!("payment notification rejected: {}", e);
            (StatusCode::OK, RESPONSE_NG)
        }
    }
}
