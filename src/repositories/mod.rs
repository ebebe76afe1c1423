use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod order_repository;
pub mod payment_method_repository;
pub mod transaction_repository;

pub use order_repository::OrderRepository;
pub use payment_method_repository::PaymentMethodRepository;
pub use transaction_repository::TransactionRepository;

/// Common behavior for repository types
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

/// Shared connection holder embedded in every repository
#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
