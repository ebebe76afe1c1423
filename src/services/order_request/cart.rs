//! Shopping-cart assembly: per-line-item builders plus the aggregating
//! cart builder.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::entities::order_item::{self, Model as OrderItemModel};
use crate::errors::ServiceError;
use crate::models::{order_request::tax_table_selector, LineItem, ShoppingCart};
use crate::models::{order_request::to_minor_units, OrderRequest};

use super::{
    CartItemBuilder, ChannelContext, CustomizedProductsBuilder, OrderRequestBuilder,
    PaymentFormData, PaymentOrder, TransactionContext,
};

pub const SHIPPING_ITEM_ID: &str = "msp-shipping";

/// Unit prices in the request are tax-exclusive. Line items store gross
/// prices, so the net price is derived here and rounded to 10 decimal
/// places before minor-unit conversion; the high precision keeps the
/// gateway's re-aggregation exact.
pub(crate) fn net_unit_price(gross: Decimal, tax_rate: Decimal) -> Decimal {
    let divisor = Decimal::ONE + tax_rate / Decimal::ONE_HUNDRED;
    (gross / divisor).round_dp(10)
}

/// Converts one order line item into a gateway cart line.
pub(crate) fn to_line_item(
    item: &OrderItemModel,
    currency: &str,
) -> Result<LineItem, ServiceError> {
    let net = net_unit_price(item.unit_price, item.tax_rate);
    Ok(LineItem {
        name: item.label.clone(),
        description: item.description.clone().unwrap_or_default(),
        unit_price: to_minor_units(net)?,
        currency: currency.to_string(),
        quantity: item.quantity,
        merchant_item_id: merchant_item_id(item),
        tax_rate: item.tax_rate,
        tax_table_selector: tax_table_selector(item.tax_rate),
    })
}

/// Merchant item id resolution, by priority: explicit product number,
/// promotion discount id (promotion-typed items only), the item's own id.
fn merchant_item_id(item: &OrderItemModel) -> String {
    if let Some(number) = item.product_number.as_deref().filter(|n| !n.is_empty()) {
        return number.to_string();
    }
    if item.item_type == order_item::TYPE_PROMOTION {
        if let Some(promotion_id) = item.promotion_id.as_deref().filter(|p| !p.is_empty()) {
            return promotion_id.to_string();
        }
    }
    item.id.to_string()
}

/// Emits one cart line per regular (non-customized) top-level line item.
pub struct OrderItemBuilder;

impl CartItemBuilder for OrderItemBuilder {
    fn build(&self, order: &PaymentOrder, currency: &str) -> Result<Vec<LineItem>, ServiceError> {
        order
            .items
            .iter()
            .filter(|item| {
                item.parent_id.is_none()
                    && item.item_type != order_item::TYPE_CUSTOMIZED_PRODUCTS
            })
            .map(|item| to_line_item(item, currency))
            .collect()
    }
}

/// Emits exactly one "Shipping" line from the order's shipping aggregate.
pub struct ShippingItemBuilder;

impl CartItemBuilder for ShippingItemBuilder {
    fn build(&self, order: &PaymentOrder, currency: &str) -> Result<Vec<LineItem>, ServiceError> {
        let o = &order.order;
        let net = net_unit_price(o.shipping_total, o.shipping_tax_rate);
        Ok(vec![LineItem {
            name: "Shipping".to_string(),
            description: String::new(),
            unit_price: to_minor_units(net)?,
            currency: currency.to_string(),
            quantity: dec!(1),
            merchant_item_id: SHIPPING_ITEM_ID.to_string(),
            tax_rate: o.shipping_tax_rate,
            tax_table_selector: tax_table_selector(o.shipping_tax_rate),
        }])
    }
}

/// Aggregates the cart-item builders into the request's shopping cart.
/// Runs after the assembler has set the money so all lines share the
/// settlement currency.
pub struct ShoppingCartBuilder {
    item_builders: Vec<Box<dyn CartItemBuilder>>,
}

impl Default for ShoppingCartBuilder {
    fn default() -> Self {
        Self {
            item_builders: vec![
                Box::new(OrderItemBuilder),
                Box::new(CustomizedProductsBuilder),
                Box::new(ShippingItemBuilder),
            ],
        }
    }
}

impl OrderRequestBuilder for ShoppingCartBuilder {
    fn build(
        &self,
        order: &PaymentOrder,
        request: &mut OrderRequest,
        _txn: &TransactionContext,
        _form: &PaymentFormData,
        _channel: &ChannelContext,
    ) -> Result<(), ServiceError> {
        if order.items.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "order {} has no line items",
                order.order.order_number
            )));
        }

        let currency = request.money.currency.clone();
        let mut items = Vec::new();
        for builder in &self.item_builders {
            items.extend(builder.build(order, &currency)?);
        }

        request.shopping_cart = Some(ShoppingCart { items });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(gross: Decimal, tax: Decimal, quantity: Decimal) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            parent_id: None,
            item_type: order_item::TYPE_PRODUCT.to_string(),
            label: "Widget".to_string(),
            description: Some("A widget".to_string()),
            quantity,
            unit_price: gross,
            tax_rate: tax,
            product_number: None,
            promotion_id: None,
            position: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    use rstest::rstest;

    #[rstest]
    #[case(dec!(12.10), dec!(21), dec!(10))]
    #[case(dec!(11.90), dec!(19), dec!(10))]
    #[case(dec!(5.45), dec!(9), dec!(5))]
    #[case(dec!(10), dec!(0), dec!(10))]
    fn net_price_strips_tax(#[case] gross: Decimal, #[case] rate: Decimal, #[case] net: Decimal) {
        assert_eq!(net_unit_price(gross, rate), net);
    }

    #[test]
    fn net_price_keeps_ten_decimal_places_for_non_terminating_divisions() {
        // 9.99 gross at 19% has no exact decimal representation
        assert_eq!(net_unit_price(dec!(9.99), dec!(19)), dec!(8.3949579832));
    }

    #[test]
    fn line_total_reconstructs_within_one_minor_unit() {
        let line = to_line_item(&item(dec!(12.10), dec!(21), dec!(3)), "EUR").unwrap();
        let reconstructed = Decimal::from(line.unit_price) * line.quantity;
        let expected = net_unit_price(dec!(12.10), dec!(21)) * dec!(3) * Decimal::ONE_HUNDRED;
        assert!((reconstructed - expected).abs() <= Decimal::ONE);
    }

    #[test]
    fn merchant_item_id_priority() {
        let mut it = item(dec!(10), dec!(0), dec!(1));

        // explicit product number wins
        it.product_number = Some("SKU-1".to_string());
        assert_eq!(merchant_item_id(&it), "SKU-1");

        // promotion discount id only applies to promotion-typed items
        it.product_number = None;
        it.promotion_id = Some("SUMMER10".to_string());
        assert_eq!(merchant_item_id(&it), it.id.to_string());

        it.item_type = order_item::TYPE_PROMOTION.to_string();
        assert_eq!(merchant_item_id(&it), "SUMMER10");
    }

    #[test]
    fn fractional_quantities_survive() {
        let mut it = item(dec!(2.50), dec!(9), dec!(0.75));
        it.label = "Cheese by weight".to_string();
        let line = to_line_item(&it, "EUR").unwrap();
        assert_eq!(line.quantity, dec!(0.75));
    }

    #[test]
    fn shipping_builder_emits_single_line() {
        let order = PaymentOrder {
            order: crate::entities::order::Model {
                id: Uuid::new_v4(),
                order_number: "10001".into(),
                sales_channel_id: "web".into(),
                currency: "EUR".into(),
                amount_total: dec!(20),
                shipping_total: dec!(4.84),
                shipping_tax_rate: dec!(21),
                customer_email: "a@b.c".into(),
                customer_phone: None,
                customer_locale: None,
                customer_ip: None,
                billing_first_name: "A".into(),
                billing_last_name: "B".into(),
                billing_street: "Main 1".into(),
                billing_zip_code: "1000".into(),
                billing_city: "Amsterdam".into(),
                billing_country: "NL".into(),
                shipping_first_name: "A".into(),
                shipping_last_name: "B".into(),
                shipping_street: "Main 1".into(),
                shipping_zip_code: "1000".into(),
                shipping_city: "Amsterdam".into(),
                shipping_country: "NL".into(),
                created_at: Utc::now(),
                updated_at: None,
            },
            items: vec![],
        };

        let lines = ShippingItemBuilder.build(&order, "EUR").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Shipping");
        assert_eq!(lines[0].merchant_item_id, SHIPPING_ITEM_ID);
        assert_eq!(lines[0].unit_price, 400);
        assert_eq!(lines[0].quantity, dec!(1));
    }
}
