//! Persistence contract shared by every backend.
//!
//! Services only ever see `Arc<dyn Store>`; the concrete adapter is chosen
//! from configuration at startup by [`open_store`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::ServiceError;
use crate::models::{Category, NewsPost, Order, OrderRecord, Product, Profile};
use crate::services::stock::{StockChange, StockConsumption, StockPolicy};

pub mod database;
pub mod dataset;
pub mod fixtures;

pub use database::DatabaseStore;
pub use dataset::{Dataset, DatasetStore, JsonFile, LocalStore, MemoryStore, Volatile};

/// CRUD surface over categories, products, profiles, orders and news.
///
/// Lists come back in their canonical order: categories by
/// `(display_order, created_at, id)`, orders and news newest first.
/// Unknown ids yield [`ServiceError::NotFound`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend label used in logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), ServiceError>;

    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError>;
    async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError>;
    async fn insert_category(&self, category: Category) -> Result<Category, ServiceError>;
    async fn update_category(&self, category: Category) -> Result<Category, ServiceError>;
    /// Exchanges the `display_order` values of two categories in one step.
    async fn swap_category_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError>;
    /// Removes a category; its products become uncategorized.
    async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn list_products(&self) -> Result<Vec<Product>, ServiceError>;
    async fn get_product(&self, id: Uuid) -> Result<Product, ServiceError>;
    async fn insert_product(&self, product: Product) -> Result<Product, ServiceError>;
    async fn update_product(&self, product: Product) -> Result<Product, ServiceError>;
    async fn swap_product_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError>;
    async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError>;
    async fn get_profile(&self, id: Uuid) -> Result<Profile, ServiceError>;
    async fn insert_profile(&self, profile: Profile) -> Result<Profile, ServiceError>;
    async fn update_profile(&self, profile: Profile) -> Result<Profile, ServiceError>;

    /// All orders, or those of one member, newest first.
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<OrderRecord>, ServiceError>;
    async fn get_order(&self, id: Uuid) -> Result<OrderRecord, ServiceError>;
    /// Applies the stock ledger and persists the order with its items as a
    /// single unit. Either both become visible or neither does.
    async fn commit_order(
        &self,
        record: OrderRecord,
        consumption: Vec<StockConsumption>,
        policy: StockPolicy,
    ) -> Result<(OrderRecord, Vec<StockChange>), ServiceError>;
    /// Writes status and timestamp fields of an existing order.
    async fn update_order(&self, order: Order) -> Result<Order, ServiceError>;

    async fn list_news(&self, published: Option<bool>) -> Result<Vec<NewsPost>, ServiceError>;
    async fn get_news(&self, id: Uuid) -> Result<NewsPost, ServiceError>;
    async fn insert_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError>;
    async fn update_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError>;
    async fn delete_news(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Builds the backend selected by `config.backend`.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, ServiceError> {
    let seed = || {
        if config.seed_fixtures {
            fixtures::dataset()
        } else {
            Dataset::default()
        }
    };

    let store: Arc<dyn Store> = match config.backend {
        StoreBackend::Memory => Arc::new(
            MemoryStore::in_memory(seed())
                .with_latency(Duration::from_millis(config.mock_latency_ms)),
        ),
        StoreBackend::Local => Arc::new(LocalStore::open(&config.local_store_path, seed).await?),
        StoreBackend::Database => {
            let pool = crate::db::establish_connection_from_app_config(config).await?;
            if config.auto_migrate {
                crate::db::run_migrations(&pool).await?;
            }
            let store = DatabaseStore::new(pool);
            if config.seed_fixtures {
                store.seed_if_empty(&fixtures::dataset()).await?;
            }
            Arc::new(store)
        }
    };

    info!(backend = store.backend(), "store ready");
    Ok(store)
}
