//! Gateway order request assembly.
//!
//! An [`OrderRequestAssembler`] runs an ordered pool of independent
//! sub-builders over a shared request under construction. Each sub-builder
//! contributes exactly one concern (description, customer, delivery,
//! shopping cart, payment options, ...) and must not depend on its siblings,
//! with one exception: the shopping-cart builder needs the money/currency
//! already present, which the assembler guarantees by setting it first.

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::config::GatewaySettings;
use crate::entities::order::Model as OrderModel;
use crate::entities::order_item::Model as OrderItemModel;
use crate::errors::ServiceError;
use crate::models::{Money, OrderRequest, OrderType, RECURRING_MODEL_CARD_ON_FILE};

pub mod builders;
pub mod cart;
pub mod customized_products;

pub use cart::{OrderItemBuilder, ShippingItemBuilder, ShoppingCartBuilder};
pub use customized_products::CustomizedProductsBuilder;

/// An order plus its line items, loaded once per assembly pass.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Identifies the host order-transaction this payment attempt belongs to.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub transaction_id: Uuid,
}

/// Per-channel data resolved before assembly: settlement currency, the
/// public base URL for return/notification links, and the effective
/// gateway settings.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub channel_id: String,
    pub currency: String,
    pub base_url: String,
    pub shop_version: Option<String>,
    pub settings: GatewaySettings,
}

/// Submitted checkout form data, threaded explicitly through the call
/// chain. Nothing in the assembler reads ambient request state.
#[derive(Debug, Clone, Default)]
pub struct PaymentFormData {
    /// Store the payment credential for later reuse
    pub tokenize: bool,
    /// Previously stored credential selected for this payment
    pub active_token: Option<String>,
    /// Encrypted payment payload for direct (inline) payments; the handler
    /// merges the form field with the raw-body fallback before this point
    pub payload: Option<String>,
    /// Chosen issuer bank for issuer-based methods
    pub issuer_id: Option<String>,
}

impl PaymentFormData {
    fn has_active_token(&self) -> bool {
        self.active_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn payload(&self) -> Option<&str> {
        self.payload.as_deref().filter(|p| !p.is_empty())
    }
}

/// One concern of the outgoing order request. Implementations mutate the
/// request additively and must not undo what another builder wrote.
pub trait OrderRequestBuilder: Send + Sync {
    fn build(
        &self,
        order: &PaymentOrder,
        request: &mut OrderRequest,
        txn: &TransactionContext,
        form: &PaymentFormData,
        channel: &ChannelContext,
    ) -> Result<(), ServiceError>;
}

/// Cart-concern builders emit line items instead of mutating the request;
/// the shopping-cart builder aggregates them.
pub trait CartItemBuilder: Send + Sync {
    fn build(
        &self,
        order: &PaymentOrder,
        currency: &str,
    ) -> Result<Vec<crate::models::LineItem>, ServiceError>;
}

pub struct OrderRequestAssembler {
    builders: Vec<Box<dyn OrderRequestBuilder>>,
}

impl OrderRequestAssembler {
    /// Composes the builder pool for a channel. The shopping-cart builder is
    /// left out entirely when the merchant excludes cart data, a legal and
    /// common configuration.
    pub fn for_channel(channel: &ChannelContext) -> Self {
        let mut builders: Vec<Box<dyn OrderRequestBuilder>> = vec![
            Box::new(builders::DescriptionBuilder),
            Box::new(builders::CustomerBuilder),
            Box::new(builders::DeliveryBuilder),
        ];
        if !channel.settings.exclude_shopping_cart {
            builders.push(Box::new(ShoppingCartBuilder::default()));
        }
        builders.push(Box::new(builders::PaymentOptionsBuilder));
        builders.push(Box::new(builders::SecondsActiveBuilder));
        builders.push(Box::new(builders::SecondChanceBuilder));
        builders.push(Box::new(builders::PluginDataBuilder));

        Self { builders }
    }

    /// Assembles the full order request for one payment attempt.
    ///
    /// The assembler itself only initializes the request and sequences the
    /// sub-builders; field-level validation lives in the builders.
    #[instrument(skip_all, fields(order_number = %order.order.order_number, gateway = %gateway_code))]
    pub fn build(
        &self,
        txn: &TransactionContext,
        order: &PaymentOrder,
        form: &PaymentFormData,
        channel: &ChannelContext,
        gateway_code: &str,
        order_type: OrderType,
        gateway_info: Map<String, Value>,
    ) -> Result<OrderRequest, ServiceError> {
        if order.order.order_number.is_empty() {
            return Err(ServiceError::ValidationError(
                "order has no order number".to_string(),
            ));
        }
        if order.order.amount_total <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "order total must be positive, got {}",
                order.order.amount_total
            )));
        }

        let money = Money::from_major(order.order.amount_total, &channel.currency)?;
        let mut request = OrderRequest::new(
            &order.order.order_number,
            money,
            gateway_code,
            order_type,
            gateway_info,
        );

        // An active stored token always triggers a direct charge, whatever
        // the caller asked for.
        if form.has_active_token() {
            request.order_type = OrderType::Direct;
        }

        if let Some(payload) = form.payload() {
            request.order_type = OrderType::Direct;
            request
                .extra
                .insert("payment_data".to_string(), json!({ "payload": payload }));
        }

        // Both a direct payload and an explicit tokenize request imply
        // card-on-file; one assignment covers both triggers.
        if form.payload().is_some() || form.tokenize {
            request.recurring_model = Some(RECURRING_MODEL_CARD_ON_FILE.to_string());
        }

        for builder in &self.builders {
            builder.build(order, &mut request, txn, form, channel)?;
        }

        Ok(request)
    }
}
