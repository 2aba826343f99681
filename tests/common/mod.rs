#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use popotte::config::AppConfig;
use popotte::db::{self, DbConfig};
use popotte::events::{self, EventSender};
use popotte::models::{Category, Product, Profile, Role, Stock, StockVariant};
use popotte::services::{CatalogService, DebtService, OrderService};
use popotte::store::{DatabaseStore, Dataset, LocalStore, MemoryStore, Store};
use popotte::{handlers, AppState};

/// Which adapter a contract test runs against.
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Local,
    Sqlite,
}

/// A store plus whatever must outlive it (the local store's directory).
pub struct TestStore {
    pub store: Arc<dyn Store>,
    _dir: Option<TempDir>,
}

impl TestStore {
    pub async fn open(backend: Backend, seed: Dataset) -> Self {
        match backend {
            Backend::Memory => Self {
                store: Arc::new(MemoryStore::in_memory(seed)),
                _dir: None,
            },
            Backend::Local => {
                let dir = tempfile::tempdir().expect("temp dir");
                let store = LocalStore::open(dir.path().join("popotte.json"), move || seed)
                    .await
                    .expect("open local store");
                Self {
                    store: Arc::new(store),
                    _dir: Some(dir),
                }
            }
            Backend::Sqlite => {
                let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
                    .await
                    .expect("sqlite pool");
                db::run_migrations(&pool).await.expect("migrations");
                let store = DatabaseStore::new(pool);
                store.seed_if_empty(&seed).await.expect("seed sqlite");
                Self {
                    store: Arc::new(store),
                    _dir: None,
                }
            }
        }
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.store.clone(), None)
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store.clone())
    }

    pub fn debts(&self) -> DebtService {
        DebtService::new(self.store.clone())
    }
}

pub fn member(full_name: &str) -> Profile {
    let username = full_name.to_lowercase().replace(' ', ".");
    Profile {
        id: Uuid::new_v4(),
        email: format!("{}@popotte.fr", username),
        full_name: full_name.to_string(),
        username,
        role: Role::User,
        created_at: Utc::now() - Duration::days(10),
    }
}

pub fn admin(full_name: &str) -> Profile {
    Profile {
        role: Role::Admin,
        ..member(full_name)
    }
}

pub fn category(name: &str, display_order: i32) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: popotte::models::category::slugify(name),
        display_order,
        created_at: Utc::now() - Duration::minutes(i64::from(100 - display_order)),
    }
}

pub fn product(name: &str, price: Decimal, stock: Stock) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        price,
        category_id: None,
        image_url: None,
        is_available: true,
        display_order: 1,
        stock,
        created_at: Utc::now() - Duration::hours(1),
    }
}

pub fn simple(quantity: u32) -> Stock {
    Stock::Simple {
        stock_quantity: quantity,
    }
}

pub fn variants(entries: &[(&str, u32)]) -> Stock {
    Stock::Variants {
        stock_variants: entries
            .iter()
            .map(|(name, quantity)| StockVariant {
                name: name.to_string(),
                quantity: *quantity,
            })
            .collect(),
    }
}

/// Helper harness serving the full router over a memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub fn new(seed: Dataset) -> Self {
        Self::with_config(seed, AppConfig::in_memory())
    }

    pub fn with_config(seed: Dataset, config: AppConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::in_memory(seed));
        Self::with_store(store, config)
    }

    pub fn with_store(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let (event_sender, event_rx) = EventSender::channel(config.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(store, config, Some(Arc::new(event_sender)));
        Self {
            router: handlers::app_router(state.clone()),
            state,
            _event_task: event_task,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
