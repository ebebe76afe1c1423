use serde::{Deserialize, Serialize};

/// Inbound gateway notification body. The gateway POSTs the full transaction
/// object; only the fields this service acts on are modeled, the rest is
/// carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Merchant order number the notification refers to
    #[serde(alias = "transactionid")]
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    /// Gateway-side transaction reference; a string or an integer
    /// depending on the endpoint that produced the notification
    #[serde(default, deserialize_with = "deserialize_transaction_id")]
    pub transaction_id: Option<String>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Gateway-reported payment type, e.g. the card brand detected after a
    /// generic "credit card" selection
    #[serde(rename = "type")]
    pub payment_type: Option<String>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

fn deserialize_transaction_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}
