use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use metrics::counter;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha512;
use tracing::{debug, warn};

use crate::config::{GatewayEnvironment, GatewaySettings};
use crate::errors::ServiceError;
use crate::models::{OrderRequest, PaymentDetails};

pub const LIVE_API_BASE: &str = "https://api.multisafepay.com/v1/json";
pub const TEST_API_BASE: &str = "https://testapi.multisafepay.com/v1/json";

/// The legacy direct client used a fixed 120s timeout; kept for parity.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(120);

type HmacSha512 = Hmac<Sha512>;

/// Response envelope shared by every gateway endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error_code: Option<i32>,
    error_info: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderData {
    pub order_id: String,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    // transaction_id can be either a string or an integer in different responses
    #[serde(default, deserialize_with = "deserialize_id")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issuer {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub currency: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundData {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub refund_id: Option<String>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// HTTP client for the gateway's JSON API. One instance per resolved
/// channel configuration; construction fails fast on a missing API key
/// before any network call happens.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    debug: bool,
}

impl GatewayClient {
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self, ServiceError> {
        if settings.api_key.trim().is_empty() {
            return Err(ServiceError::ConfigurationError(
                "gateway api key is not configured".to_string(),
            ));
        }

        let base_url = settings.api_base.clone().unwrap_or_else(|| {
            match settings.environment {
                GatewayEnvironment::Live => LIVE_API_BASE,
                GatewayEnvironment::Test => TEST_API_BASE,
            }
            .to_string()
        });

        let http = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: settings.api_key.clone(),
            debug: settings.debug,
        })
    }

    /// `POST /orders`
    pub async fn create_order(&self, request: &OrderRequest) -> Result<OrderData, ServiceError> {
        self.call(Method::POST, "orders", Some(request)).await
    }

    /// `PATCH /orders/{id}`
    pub async fn update_order(
        &self,
        order_id: &str,
        body: &Value,
    ) -> Result<OrderData, ServiceError> {
        self.call(Method::PATCH, &format!("orders/{order_id}"), Some(body))
            .await
    }

    /// `GET /orders/{id}`
    pub async fn get_order(&self, order_id: &str) -> Result<OrderData, ServiceError> {
        self.call::<OrderData, ()>(Method::GET, &format!("orders/{order_id}"), None)
            .await
    }

    /// `GET /issuers/{gateway}` for issuer-based methods such as iDEAL
    pub async fn list_issuers(&self, gateway: &str) -> Result<Vec<Issuer>, ServiceError> {
        self.call::<Vec<Issuer>, ()>(Method::GET, &format!("issuers/{gateway}"), None)
            .await
    }

    /// `POST /orders/{id}/refunds`
    pub async fn refund_order(
        &self,
        order_id: &str,
        refund: &RefundRequest,
    ) -> Result<RefundData, ServiceError> {
        self.call(
            Method::POST,
            &format!("orders/{order_id}/refunds"),
            Some(refund),
        )
        .await
    }

    async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{}", self.base_url, path);
        counter!("msp_gateway_requests_total", 1, "path" => path.to_string());

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header("api_key", &self.api_key);
        if let Some(body) = body {
            if self.debug {
                debug!(%url, payload = %serde_json::to_string(body).unwrap_or_default(), "gateway request");
            }
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            counter!("msp_gateway_transport_errors_total", 1);
            ServiceError::ExternalApiError(format!("{} {} failed: {}", method, url, e))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ServiceError::ExternalApiError(format!("reading gateway response failed: {e}"))
        })?;
        if self.debug {
            debug!(%url, %status, body = %text, "gateway response");
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            ServiceError::ExternalApiError(format!(
                "malformed gateway response ({status}): {e}"
            ))
        })?;

        if !envelope.success {
            counter!("msp_gateway_api_errors_total", 1);
            warn!(
                %url,
                error_code = envelope.error_code,
                error_info = envelope.error_info.as_deref().unwrap_or(""),
                "gateway rejected request"
            );
            return Err(ServiceError::GatewayError(format!(
                "gateway error {}: {}",
                envelope.error_code.unwrap_or_default(),
                envelope.error_info.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        envelope.data.ok_or_else(|| {
            ServiceError::ExternalApiError("gateway response missing data".to_string())
        })
    }
}

/// Verifies the `auth` header of an inbound notification: the gateway signs
/// the raw body with HMAC-SHA512 keyed by the merchant API key, hex-encodes
/// the digest and base64-encodes that.
pub fn verify_notification(payload: &[u8], auth_header: &str, api_key: &str) -> bool {
    let Ok(mut mac) = HmacSha512::new_from_slice(api_key.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let digest_hex = hex::encode(mac.finalize().into_bytes());
    let expected = BASE64.encode(digest_hex.as_bytes());
    constant_time_eq(expected.as_bytes(), auth_header.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.iter().zip(b) {
        res |= x ^ y;
    }
    res == 0
}
