pub mod checkout;
pub mod common;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::GatewayPort;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub analytics: Arc<crate::services::analytics::CampaignAnalyticsService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn GatewayPort>,
        default_currency: String,
    ) -> Self {
        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db_pool.clone(),
            gateway,
            event_sender,
            default_currency,
        ));
        let analytics = Arc::new(crate::services::analytics::CampaignAnalyticsService::new(
            db_pool,
        ));

        Self {
            checkout,
            analytics,
        }
    }
}
