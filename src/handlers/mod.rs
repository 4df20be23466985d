pub mod analytics;
pub mod orders;
pub mod tracking;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::orders::OrderService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let order = Arc::new(OrderService::new(db_pool, event_sender));
        Self { order }
    }
}
