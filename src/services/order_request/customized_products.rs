//! Folding of customized-product groups into single cart lines.
//!
//! A customized product arrives as a parent line item carrying a
//! "product"-typed child (the base article) plus "customized-products-option"
//! children, which may nest further options. The gateway has no notion of
//! nested cart lines, so the whole group collapses into one synthetic line:
//! names, descriptions and merchant item ids joined with ": ", unit prices
//! summed, and the tax-table selector taken from the highest rate involved.

use tracing::warn;
use uuid::Uuid;

use crate::entities::order_item::{self, Model as OrderItemModel};
use crate::errors::ServiceError;
use crate::models::{order_request::tax_table_selector, LineItem};

use super::{cart::to_line_item, CartItemBuilder, PaymentOrder};

pub struct CustomizedProductsBuilder;

impl CartItemBuilder for CustomizedProductsBuilder {
    fn build(&self, order: &PaymentOrder, currency: &str) -> Result<Vec<LineItem>, ServiceError> {
        let mut lines = Vec::new();

        for parent in order.items.iter().filter(|item| {
            item.parent_id.is_none() && item.item_type == order_item::TYPE_CUSTOMIZED_PRODUCTS
        }) {
            let children = children_of(&order.items, parent.id);

            let Some(base_item) = children
                .iter()
                .find(|child| child.item_type == order_item::TYPE_PRODUCT)
            else {
                warn!(
                    order_number = %order.order.order_number,
                    parent_item = %parent.id,
                    "customized-products group without a product child, skipping"
                );
                continue;
            };

            let mut line = to_line_item(base_item, currency)?;
            for option in children
                .iter()
                .filter(|child| child.item_type == order_item::TYPE_CUSTOMIZED_PRODUCTS_OPTION)
            {
                fold_option(&mut line, option, &order.items, currency)?;
            }
            lines.push(line);
        }

        Ok(lines)
    }
}

/// Folds one option (and, depth-first, all of its own option children) into
/// the synthetic line. Iteration continues over remaining siblings after a
/// nested option is folded, so no trailing sibling is ever dropped.
fn fold_option(
    line: &mut LineItem,
    option: &OrderItemModel,
    all_items: &[OrderItemModel],
    currency: &str,
) -> Result<(), ServiceError> {
    let option_line = to_line_item(option, currency)?;
    merge_into(line, &option_line);

    for child in children_of(all_items, option.id)
        .into_iter()
        .filter(|child| child.item_type == order_item::TYPE_CUSTOMIZED_PRODUCTS_OPTION)
    {
        fold_option(line, child, all_items, currency)?;
    }

    Ok(())
}

fn merge_into(base: &mut LineItem, option: &LineItem) {
    base.name = format!("{}: {}", base.name, option.name);
    if !option.description.is_empty() {
        if base.description.is_empty() {
            base.description = option.description.clone();
        } else {
            base.description = format!("{}: {}", base.description, option.description);
        }
    }
    base.merchant_item_id = format!("{}: {}", base.merchant_item_id, option.merchant_item_id);
    base.unit_price += option.unit_price;
    if option.tax_rate > base.tax_rate {
        base.tax_rate = option.tax_rate;
    }
    base.tax_table_selector = tax_table_selector(base.tax_rate);
}

fn children_of(items: &[OrderItemModel], parent_id: Uuid) -> Vec<&OrderItemModel> {
    let mut children: Vec<&OrderItemModel> = items
        .iter()
        .filter(|item| item.parent_id == Some(parent_id))
        .collect();
    children.sort_by_key(|item| item.position);
    children
}
