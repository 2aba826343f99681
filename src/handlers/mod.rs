pub mod categories;
pub mod common;
pub mod health;
pub mod news;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{CatalogService, DebtService, NewsService, OrderService, UserService};
use crate::store::Store;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub debts: Arc<DebtService>,
    pub users: Arc<UserService>,
    pub news: Arc<NewsService>,
}

impl AppServices {
    /// Builds every service over the same store.
    pub fn new(
        store: Arc<dyn Store>,
        event_sender: Option<Arc<EventSender>>,
        config: &AppConfig,
    ) -> Self {
        let orders = OrderService::new(store.clone(), event_sender)
            .with_stock_policy(config.stock_policy)
            .with_transition_policy(config.transition_policy)
            .with_payment_url(config.payment_url.clone());

        Self {
            catalog: Arc::new(CatalogService::new(store.clone())),
            orders: Arc::new(orders),
            debts: Arc::new(DebtService::new(store.clone())),
            users: Arc::new(UserService::new(store.clone())),
            news: Arc::new(NewsService::new(store)),
        }
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", categories::categories_routes())
        .nest("/products", products::products_routes())
        .nest("/orders", orders::orders_routes())
        .nest("/users", users::users_routes())
        .nest("/news", news::news_routes())
        .nest("/stats", stats::stats_routes())
}

/// Full HTTP surface: `/health` plus the versioned API.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
