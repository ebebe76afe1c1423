use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Gateway code this method maps to (e.g. "IDEAL", "VISA", "CREDITCARD")
    pub gateway_code: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_transaction::Entity")]
    OrderTransaction,
}

impl Related<super::order_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
