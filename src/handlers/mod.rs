pub mod notifications;
pub mod payments;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::PaymentService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let payments = Arc::new(PaymentService::new(db, config, event_sender));
        Self { payments }
    }
}
