use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;

pub const RECURRING_MODEL_CARD_ON_FILE: &str = "cardOnFile";

/// Redirect sends the shopper to the gateway's payment page; direct submits
/// payment data (e.g. an encrypted card payload or a stored token) inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Redirect,
    Direct,
}

/// Integer-safe amount in minor units plus its ISO-4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    /// Converts a major-unit decimal amount to minor units with explicit
    /// rounding. Float multiplication by 100 is a known source of
    /// off-by-one-cent drift, so everything stays in `Decimal` until the
    /// final integer conversion.
    pub fn from_major(amount: Decimal, currency: impl Into<String>) -> Result<Self, ServiceError> {
        let minor = to_minor_units(amount)?;
        Ok(Self {
            amount: minor,
            currency: currency.into(),
        })
    }
}

/// Rounds a major-unit amount to minor units (banker's rounding avoided;
/// half-up matches what the gateway re-aggregates to).
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("amount {} out of range for minor units", amount))
        })
}

/// Stringified tax rate used for gateway-side tax-table matching.
pub fn tax_table_selector(rate: Decimal) -> String {
    rate.normalize().to_string()
}

/// One shopping-cart line as sent to the gateway. `unit_price` is
/// tax-exclusive, in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub unit_price: i64,
    pub currency: String,
    pub quantity: Decimal,
    pub merchant_item_id: String,
    pub tax_rate: Decimal,
    pub tax_table_selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingCart {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub zip_code: String,
    pub city: String,
    pub country: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub zip_code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOptions {
    pub notification_url: String,
    pub redirect_url: String,
    pub cancel_url: String,
    pub close_window: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondChance {
    pub send_email: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDetails {
    pub shop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_version: Option<String>,
    pub plugin_version: String,
}

/// The payload sent to the gateway to initiate one payment attempt.
///
/// Built incrementally by the assembler's sub-builders during a single
/// synchronous pass, then treated as immutable. Never persisted locally;
/// the gateway is the system of record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub order_id: String,
    pub gateway: String,
    #[serde(flatten)]
    pub money: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub gateway_info: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopping_cart: Option<ShoppingCart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_options: Option<PaymentOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_active: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_chance: Option<SecondChance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginDetails>,
    /// Free-form extras (direct payment payload, custom fields). Flattened
    /// into the top-level request object on the wire.
    #[serde(flatten, skip_serializing_if = "Map::is_empty", default)]
    pub extra: Map<String, Value>,
}

impl OrderRequest {
    pub fn new(
        order_id: impl Into<String>,
        money: Money,
        gateway: impl Into<String>,
        order_type: OrderType,
        gateway_info: Map<String, Value>,
    ) -> Self {
        Self {
            order_type,
            order_id: order_id.into(),
            gateway: gateway.into(),
            money,
            description: None,
            gateway_info,
            shopping_cart: None,
            customer: None,
            delivery: None,
            payment_options: None,
            seconds_active: None,
            second_chance: None,
            recurring_model: None,
            plugin: None,
            extra: Map::new(),
        }
    }
}
