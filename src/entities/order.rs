use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Order number must be between 1 and 50 characters"
    ))]
    pub order_number: String,

    pub sales_channel_id: String,
    pub currency: String,
    pub amount_total: Decimal,
    pub shipping_total: Decimal,
    pub shipping_tax_rate: Decimal,

    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_locale: Option<String>,
    pub customer_ip: Option<String>,

    pub billing_first_name: String,
    pub billing_last_name: String,
    pub billing_street: String,
    pub billing_zip_code: String,
    pub billing_city: String,
    pub billing_country: String,

    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_street: String,
    pub shipping_zip_code: String,
    pub shipping_city: String,
    pub shipping_country: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::order_transaction::Entity")]
    OrderTransaction,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::order_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
