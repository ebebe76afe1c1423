use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item types relevant to cart assembly. Customized products nest:
/// a parent item carries a "product" child plus option children, which may
/// themselves carry further option children.
pub const TYPE_PRODUCT: &str = "product";
pub const TYPE_PROMOTION: &str = "promotion";
pub const TYPE_CUSTOMIZED_PRODUCTS: &str = "customized-products";
pub const TYPE_CUSTOMIZED_PRODUCTS_OPTION: &str = "customized-products-option";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    /// Parent line item, set for customized-product children
    pub parent_id: Option<Uuid>,
    pub item_type: String,
    pub label: String,
    pub description: Option<String>,
    /// Fractional quantities are legal (weight-based products)
    pub quantity: Decimal,
    /// Gross unit price, tax included
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub product_number: Option<String>,
    /// Discount id for promotion-typed items
    pub promotion_id: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
