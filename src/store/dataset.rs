//! In-process dataset shared by the memory and local-file backends.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::Store;
use crate::errors::ServiceError;
use crate::models::{Category, NewsPost, Order, OrderItem, OrderRecord, Product, Profile};
use crate::services::stock::{self, StockChange, StockConsumption, StockPolicy};

/// Every entity the application stores, as plain vectors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub news: Vec<NewsPost>,
}

fn find<'a, T>(
    rows: &'a [T],
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    entity: &str,
) -> Result<&'a T, ServiceError> {
    rows.iter()
        .find(|row| key(row) == id)
        .ok_or_else(|| ServiceError::not_found(entity, id))
}

fn find_mut<'a, T>(
    rows: &'a mut [T],
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    entity: &str,
) -> Result<&'a mut T, ServiceError> {
    rows.iter_mut()
        .find(|row| key(row) == id)
        .ok_or_else(|| ServiceError::not_found(entity, id))
}

fn replace<T: Clone>(
    rows: &mut [T],
    row: T,
    key: impl Fn(&T) -> Uuid,
    entity: &str,
) -> Result<T, ServiceError> {
    let slot = find_mut(rows, key(&row), &key, entity)?;
    *slot = row.clone();
    Ok(row)
}

fn ensure_absent<T>(
    rows: &[T],
    id: Uuid,
    key: impl Fn(&T) -> Uuid,
    entity: &str,
) -> Result<(), ServiceError> {
    if rows.iter().any(|row| key(row) == id) {
        return Err(ServiceError::Conflict(format!(
            "{} {} already exists",
            entity, id
        )));
    }
    Ok(())
}

/// Mirrors the unique indexes of the database schema.
fn ensure_unique<T>(
    rows: &[T],
    row: &T,
    key: impl Fn(&T) -> Uuid,
    field: &str,
    value: impl Fn(&T) -> &str,
) -> Result<(), ServiceError> {
    let id = key(row);
    let wanted = value(row);
    if rows
        .iter()
        .any(|other| key(other) != id && value(other) == wanted)
    {
        return Err(ServiceError::Conflict(format!(
            "{} {} is already taken",
            field, wanted
        )));
    }
    Ok(())
}

impl Dataset {
    fn check_category(&self, category: &Category) -> Result<(), ServiceError> {
        ensure_unique(&self.categories, category, |c| c.id, "Name", |c| &c.name)?;
        ensure_unique(&self.categories, category, |c| c.id, "Slug", |c| &c.slug)
    }

    fn check_profile(&self, profile: &Profile) -> Result<(), ServiceError> {
        ensure_unique(&self.profiles, profile, |p| p.id, "Email", |p| &p.email)?;
        ensure_unique(&self.profiles, profile, |p| p.id, "Username", |p| &p.username)
    }

    pub fn categories_sorted(&self) -> Vec<Category> {
        let mut categories = self.categories.clone();
        categories.sort_by_key(Category::sort_key);
        categories
    }

    pub fn category(&self, id: Uuid) -> Result<&Category, ServiceError> {
        find(&self.categories, id, |c| c.id, "Category")
    }

    pub fn insert_category(&mut self, category: Category) -> Result<Category, ServiceError> {
        ensure_absent(&self.categories, category.id, |c| c.id, "Category")?;
        self.check_category(&category)?;
        self.categories.push(category.clone());
        Ok(category)
    }

    pub fn update_category(&mut self, category: Category) -> Result<Category, ServiceError> {
        self.check_category(&category)?;
        replace(&mut self.categories, category, |c| c.id, "Category")
    }

    pub fn swap_category_order(&mut self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        let first = self.category(a)?.display_order;
        let second = self.category(b)?.display_order;
        find_mut(&mut self.categories, a, |c| c.id, "Category")?.display_order = second;
        find_mut(&mut self.categories, b, |c| c.id, "Category")?.display_order = first;
        Ok(())
    }

    /// Removes the category and detaches its products.
    pub fn delete_category(&mut self, id: Uuid) -> Result<(), ServiceError> {
        self.category(id)?;
        self.categories.retain(|c| c.id != id);
        for product in self.products.iter_mut().filter(|p| p.category_id == Some(id)) {
            product.category_id = None;
        }
        Ok(())
    }

    pub fn product(&self, id: Uuid) -> Result<&Product, ServiceError> {
        find(&self.products, id, |p| p.id, "Product")
    }

    pub fn insert_product(&mut self, product: Product) -> Result<Product, ServiceError> {
        ensure_absent(&self.products, product.id, |p| p.id, "Product")?;
        self.products.push(product.clone());
        Ok(product)
    }

    pub fn update_product(&mut self, product: Product) -> Result<Product, ServiceError> {
        replace(&mut self.products, product, |p| p.id, "Product")
    }

    pub fn swap_product_order(&mut self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        let first = self.product(a)?.display_order;
        let second = self.product(b)?.display_order;
        find_mut(&mut self.products, a, |p| p.id, "Product")?.display_order = second;
        find_mut(&mut self.products, b, |p| p.id, "Product")?.display_order = first;
        Ok(())
    }

    pub fn delete_product(&mut self, id: Uuid) -> Result<(), ServiceError> {
        self.product(id)?;
        self.products.retain(|p| p.id != id);
        Ok(())
    }

    pub fn profile(&self, id: Uuid) -> Result<&Profile, ServiceError> {
        find(&self.profiles, id, |p| p.id, "User")
    }

    pub fn insert_profile(&mut self, profile: Profile) -> Result<Profile, ServiceError> {
        ensure_absent(&self.profiles, profile.id, |p| p.id, "User")?;
        self.check_profile(&profile)?;
        self.profiles.push(profile.clone());
        Ok(profile)
    }

    pub fn update_profile(&mut self, profile: Profile) -> Result<Profile, ServiceError> {
        self.check_profile(&profile)?;
        replace(&mut self.profiles, profile, |p| p.id, "User")
    }

    fn record(&self, order: &Order) -> OrderRecord {
        OrderRecord {
            order: order.clone(),
            items: self
                .order_items
                .iter()
                .filter(|item| item.order_id == order.id)
                .cloned()
                .collect(),
        }
    }

    /// Orders newest first, optionally restricted to one member.
    pub fn orders(&self, user_id: Option<Uuid>) -> Vec<OrderRecord> {
        let mut orders: Vec<&Order> = self
            .orders
            .iter()
            .filter(|o| user_id.map_or(true, |uid| o.user_id == uid))
            .collect();
        orders.sort_by_key(|o| (Reverse(o.created_at), o.id));
        orders.into_iter().map(|o| self.record(o)).collect()
    }

    pub fn order(&self, id: Uuid) -> Result<OrderRecord, ServiceError> {
        find(&self.orders, id, |o| o.id, "Order").map(|o| self.record(o))
    }

    /// Runs the stock ledger over the stored products, then appends the
    /// order and its items. On error nothing has changed.
    pub fn commit_order(
        &mut self,
        record: OrderRecord,
        consumption: &[StockConsumption],
        policy: StockPolicy,
    ) -> Result<(OrderRecord, Vec<StockChange>), ServiceError> {
        ensure_absent(&self.orders, record.order.id, |o| o.id, "Order")?;
        let changes = stock::apply_consumption(&mut self.products, consumption, policy)?;
        self.orders.push(record.order.clone());
        self.order_items.extend(record.items.iter().cloned());
        Ok((record, changes))
    }

    pub fn update_order(&mut self, order: Order) -> Result<Order, ServiceError> {
        replace(&mut self.orders, order, |o| o.id, "Order")
    }

    /// News newest first, optionally filtered on the published flag.
    pub fn news(&self, published: Option<bool>) -> Vec<NewsPost> {
        let mut posts: Vec<NewsPost> = self
            .news
            .iter()
            .filter(|p| published.map_or(true, |flag| p.published == flag))
            .cloned()
            .collect();
        posts.sort_by_key(|p| (Reverse(p.created_at), p.id));
        posts
    }

    pub fn news_post(&self, id: Uuid) -> Result<&NewsPost, ServiceError> {
        find(&self.news, id, |p| p.id, "News post")
    }

    pub fn insert_news(&mut self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        ensure_absent(&self.news, post.id, |p| p.id, "News post")?;
        self.news.push(post.clone());
        Ok(post)
    }

    pub fn update_news(&mut self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        replace(&mut self.news, post, |p| p.id, "News post")
    }

    pub fn delete_news(&mut self, id: Uuid) -> Result<(), ServiceError> {
        self.news_post(id)?;
        self.news.retain(|p| p.id != id);
        Ok(())
    }
}

/// Where a [`DatasetStore`] writes its state after each mutation.
#[async_trait]
pub trait Persistence: Send + Sync {
    fn label(&self) -> &'static str;

    async fn save(&self, data: &Dataset) -> Result<(), ServiceError>;

    async fn check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Keeps state in process memory only.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volatile;

#[async_trait]
impl Persistence for Volatile {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, _data: &Dataset) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Writes the whole dataset as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Option<Dataset>, ServiceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read data file");
                Err(ServiceError::BackendUnavailable(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        }
    }
}

#[async_trait]
impl Persistence for JsonFile {
    fn label(&self) -> &'static str {
        "local"
    }

    /// Writes a sibling temporary file then renames it over the target.
    async fn save(&self, data: &Dataset) -> Result<(), ServiceError> {
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp_path = self.path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            error!(path = %tmp_path.display(), error = %e, "failed to write data file");
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            error!(path = %self.path.display(), error = %e, "failed to replace data file");
            return Err(e.into());
        }
        debug!(path = %self.path.display(), bytes = bytes.len(), "data file written");
        Ok(())
    }

    async fn check(&self) -> Result<(), ServiceError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(ServiceError::BackendUnavailable(format!(
                "data directory {} is not reachable",
                dir.display()
            ))),
        }
    }
}

/// A [`Store`] over a [`Dataset`] held behind a read-write lock.
///
/// Mutations run against a copy of the dataset. The copy is persisted and
/// only then swapped in, so a failed write or a rejected order leaves the
/// visible state untouched.
#[derive(Debug)]
pub struct DatasetStore<P: Persistence> {
    state: RwLock<Dataset>,
    persistence: P,
    latency: Duration,
}

pub type MemoryStore = DatasetStore<Volatile>;
pub type LocalStore = DatasetStore<JsonFile>;

impl MemoryStore {
    pub fn in_memory(seed: Dataset) -> Self {
        DatasetStore::new(seed, Volatile)
    }
}

impl LocalStore {
    /// Loads `path`, or creates it from `seed` when absent.
    pub async fn open(
        path: impl Into<PathBuf>,
        seed: impl FnOnce() -> Dataset,
    ) -> Result<Self, ServiceError> {
        let file = JsonFile::new(path);
        let data = match file.load().await? {
            Some(data) => {
                info!(path = %file.path().display(), "loaded local data file");
                data
            }
            None => {
                let data = seed();
                file.save(&data).await?;
                info!(path = %file.path().display(), "created local data file");
                data
            }
        };
        Ok(DatasetStore::new(data, file))
    }
}

impl<P: Persistence> DatasetStore<P> {
    pub fn new(data: Dataset, persistence: P) -> Self {
        Self {
            state: RwLock::new(data),
            persistence,
            latency: Duration::ZERO,
        }
    }

    /// Delays every call, to mimic a remote backend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> Dataset {
        self.state.read().await.clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn read<T>(&self, f: impl FnOnce(&Dataset) -> T + Send) -> T {
        self.simulate_latency().await;
        let guard = self.state.read().await;
        f(&guard)
    }

    async fn mutate<T: Send>(
        &self,
        f: impl FnOnce(&mut Dataset) -> Result<T, ServiceError> + Send,
    ) -> Result<T, ServiceError> {
        self.simulate_latency().await;
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persistence.save(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl<P: Persistence + 'static> Store for DatasetStore<P> {
    fn backend(&self) -> &'static str {
        self.persistence.label()
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        self.persistence.check().await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.read(|d| d.categories_sorted()).await)
    }

    async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError> {
        self.read(|d| d.category(id).cloned()).await
    }

    async fn insert_category(&self, category: Category) -> Result<Category, ServiceError> {
        self.mutate(|d| d.insert_category(category)).await
    }

    async fn update_category(&self, category: Category) -> Result<Category, ServiceError> {
        self.mutate(|d| d.update_category(category)).await
    }

    async fn swap_category_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        self.mutate(|d| d.swap_category_order(a, b)).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        self.mutate(|d| d.delete_category(id)).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.read(|d| d.products.clone()).await)
    }

    async fn get_product(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.read(|d| d.product(id).cloned()).await
    }

    async fn insert_product(&self, product: Product) -> Result<Product, ServiceError> {
        self.mutate(|d| d.insert_product(product)).await
    }

    async fn update_product(&self, product: Product) -> Result<Product, ServiceError> {
        self.mutate(|d| d.update_product(product)).await
    }

    async fn swap_product_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        self.mutate(|d| d.swap_product_order(a, b)).await
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        self.mutate(|d| d.delete_product(id)).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        Ok(self.read(|d| d.profiles.clone()).await)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Profile, ServiceError> {
        self.read(|d| d.profile(id).cloned()).await
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, ServiceError> {
        self.mutate(|d| d.insert_profile(profile)).await
    }

    async fn update_profile(&self, profile: Profile) -> Result<Profile, ServiceError> {
        self.mutate(|d| d.update_profile(profile)).await
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<OrderRecord>, ServiceError> {
        Ok(self.read(|d| d.orders(user_id)).await)
    }

    async fn get_order(&self, id: Uuid) -> Result<OrderRecord, ServiceError> {
        self.read(|d| d.order(id)).await
    }

    #[instrument(skip(self, record, consumption), fields(order_id = %record.order.id, backend = self.persistence.label()))]
    async fn commit_order(
        &self,
        record: OrderRecord,
        consumption: Vec<StockConsumption>,
        policy: StockPolicy,
    ) -> Result<(OrderRecord, Vec<StockChange>), ServiceError> {
        self.mutate(|d| d.commit_order(record, &consumption, policy))
            .await
    }

    async fn update_order(&self, order: Order) -> Result<Order, ServiceError> {
        self.mutate(|d| d.update_order(order)).await
    }

    async fn list_news(&self, published: Option<bool>) -> Result<Vec<NewsPost>, ServiceError> {
        Ok(self.read(|d| d.news(published)).await)
    }

    async fn get_news(&self, id: Uuid) -> Result<NewsPost, ServiceError> {
        self.read(|d| d.news_post(id).cloned()).await
    }

    async fn insert_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        self.mutate(|d| d.insert_news(post)).await
    }

    async fn update_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        self.mutate(|d| d.update_news(post)).await
    }

    async fn delete_news(&self, id: Uuid) -> Result<(), ServiceError> {
        self.mutate(|d| d.delete_news(id)).await
    }
}
