use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::order_transaction::{
    ActiveModel, Column, Entity as OrderTransaction, Model as TransactionModel,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    base: BaseRepository,
}

impl TransactionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionModel>, ServiceError> {
        OrderTransaction::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Latest transaction for an order; an order accumulates one transaction
    /// per payment attempt and only the newest one is actionable.
    pub async fn find_latest_by_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<TransactionModel>, ServiceError> {
        OrderTransaction::find()
            .filter(Column::OrderId.eq(order_id))
            .order_by_desc(Column::CreatedAt)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn update_state(
        &self,
        transaction: TransactionModel,
        new_state: &str,
    ) -> Result<TransactionModel, ServiceError> {
        let version = transaction.version;
        let mut active: ActiveModel = transaction.into();
        active.state = Set(new_state.to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(version + 1);

        active
            .update(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn update_payment_method(
        &self,
        transaction: TransactionModel,
        payment_method_id: Uuid,
    ) -> Result<TransactionModel, ServiceError> {
        let mut active: ActiveModel = transaction.into();
        active.payment_method_id = Set(payment_method_id);
        active.updated_at = Set(Some(Utc::now()));

        active
            .update(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn set_gateway_transaction_id(
        &self,
        transaction: TransactionModel,
        gateway_transaction_id: &str,
    ) -> Result<TransactionModel, ServiceError> {
        let mut active: ActiveModel = transaction.into();
        active.gateway_transaction_id = Set(Some(gateway_transaction_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));

        active
            .update(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

impl Repository for TransactionRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
