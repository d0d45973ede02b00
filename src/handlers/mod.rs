pub mod common;
pub mod customers;
pub mod meals;
pub mod orders;
pub mod users;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub meals: Arc<crate::services::meals::MealService>,
    pub customers: Arc<crate::services::customers::CustomerService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub users: Arc<crate::services::users::UserService>,
}

impl AppServices {
    /// Build the AppServices container from the shared pool and event channel.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let meals = Arc::new(crate::services::meals::MealService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let customers = Arc::new(crate::services::customers::CustomerService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool,
            Some(event_sender),
        ));

        Self {
            meals,
            customers,
            orders,
            users,
        }
    }
}
