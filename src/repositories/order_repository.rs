use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::order::{Column, Entity as Order, Model as OrderModel};
use crate::entities::order_item::{
    Column as ItemColumn, Entity as OrderItem, Model as OrderItemModel,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

/// Read access to the host's order data. Orders are owned by the host order
/// system; this service never creates or deletes them.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Order::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        Order::find()
            .filter(Column::OrderNumber.eq(order_number))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Line items in display order, nested children included.
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        let order = self.find_by_id(order_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Order with ID {} not found", order_id))
        })?;

        order
            .find_related(OrderItem)
            .order_by_asc(ItemColumn::Position)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

impl Repository for OrderRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
