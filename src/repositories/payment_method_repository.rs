use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::payment_method::{Column, Entity as PaymentMethod, Model as PaymentMethodModel};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    base: BaseRepository,
}

impl PaymentMethodRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethodModel>, ServiceError> {
        PaymentMethod::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// First active method handling the given gateway code, if any.
    pub async fn find_by_gateway_code(
        &self,
        gateway_code: &str,
    ) -> Result<Option<PaymentMethodModel>, ServiceError> {
        PaymentMethod::find()
            .filter(Column::GatewayCode.eq(gateway_code))
            .filter(Column::Active.eq(true))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

impl Repository for PaymentMethodRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
