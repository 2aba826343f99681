use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{Dataset, Store};
use crate::db::{self, DbPool};
use crate::entities::{category, news_post, order, order_item, product, profile};
use crate::errors::ServiceError;
use crate::models::{Category, NewsPost, Order, OrderItem, OrderRecord, Product, Profile};
use crate::services::stock::{self, StockChange, StockConsumption, StockPolicy};

/// Maps a database error, surfacing unique violations as conflicts.
fn db_err(operation: &'static str) -> impl Fn(DbErr) -> ServiceError {
    move |e| {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
            return ServiceError::Conflict(detail);
        }
        error!(operation = operation, error = %e, "database operation failed");
        ServiceError::from_db(e)
    }
}

/// [`Store`] over a sea-orm connection pool (PostgreSQL or SQLite).
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: DbPool,
}

impl DatabaseStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DbPool {
        &self.db
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        self.db.begin().await.map_err(db_err("begin"))
    }

    async fn commit(txn: DatabaseTransaction) -> Result<(), ServiceError> {
        txn.commit().await.map_err(db_err("commit"))
    }

    /// Loads `data` when the database holds no categories and no profiles.
    pub async fn seed_if_empty(&self, data: &Dataset) -> Result<bool, ServiceError> {
        let categories = category::Entity::find()
            .count(&self.db)
            .await
            .map_err(db_err("count categories"))?;
        let profiles = profile::Entity::find()
            .count(&self.db)
            .await
            .map_err(db_err("count profiles"))?;
        if categories > 0 || profiles > 0 {
            return Ok(false);
        }

        let txn = self.begin().await?;
        for row in &data.categories {
            category::ActiveModel::from(row.clone())
                .insert(&txn)
                .await
                .map_err(db_err("seed category"))?;
        }
        for row in &data.products {
            product::ActiveModel::try_from(row.clone())?
                .insert(&txn)
                .await
                .map_err(db_err("seed product"))?;
        }
        for row in &data.profiles {
            profile::ActiveModel::from(row.clone())
                .insert(&txn)
                .await
                .map_err(db_err("seed profile"))?;
        }
        for row in &data.orders {
            order::ActiveModel::from(row.clone())
                .insert(&txn)
                .await
                .map_err(db_err("seed order"))?;
        }
        for row in &data.order_items {
            order_item::ActiveModel::try_from(row.clone())?
                .insert(&txn)
                .await
                .map_err(db_err("seed order item"))?;
        }
        for row in &data.news {
            news_post::ActiveModel::from(row.clone())
                .insert(&txn)
                .await
                .map_err(db_err("seed news"))?;
        }
        Self::commit(txn).await?;

        info!(
            categories = data.categories.len(),
            products = data.products.len(),
            profiles = data.profiles.len(),
            "seeded empty database"
        );
        Ok(true)
    }

    async fn items_for(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, ServiceError> {
        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("list order items"))?;
        for row in rows {
            let item = OrderItem::try_from(row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl Store for DatabaseStore {
    fn backend(&self) -> &'static str {
        "database"
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        db::check_connection(&self.db).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        let rows = category::Entity::find()
            .order_by_asc(category::Column::DisplayOrder)
            .order_by_asc(category::Column::CreatedAt)
            .order_by_asc(category::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("list categories"))?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("get category"))?
            .map(Category::from)
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    async fn insert_category(&self, category: Category) -> Result<Category, ServiceError> {
        let model = category::ActiveModel::from(category)
            .insert(&self.db)
            .await
            .map_err(db_err("insert category"))?;
        Ok(model.into())
    }

    async fn update_category(&self, category: Category) -> Result<Category, ServiceError> {
        self.get_category(category.id).await?;
        let model = category::ActiveModel::from(category)
            .update(&self.db)
            .await
            .map_err(db_err("update category"))?;
        Ok(model.into())
    }

    async fn swap_category_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        let txn = self.begin().await?;
        let first = category::Entity::find_by_id(a)
            .one(&txn)
            .await
            .map_err(db_err("get category"))?
            .ok_or_else(|| ServiceError::not_found("Category", a))?;
        let second = category::Entity::find_by_id(b)
            .one(&txn)
            .await
            .map_err(db_err("get category"))?
            .ok_or_else(|| ServiceError::not_found("Category", b))?;

        let (first_order, second_order) = (first.display_order, second.display_order);
        let mut first: category::ActiveModel = first.into();
        first.display_order = sea_orm::Set(second_order);
        first.update(&txn).await.map_err(db_err("swap categories"))?;
        let mut second: category::ActiveModel = second.into();
        second.display_order = sea_orm::Set(first_order);
        second.update(&txn).await.map_err(db_err("swap categories"))?;

        Self::commit(txn).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.begin().await?;
        category::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err("get category"))?
            .ok_or_else(|| ServiceError::not_found("Category", id))?;

        product::Entity::update_many()
            .col_expr(product::Column::CategoryId, Expr::value(Option::<Uuid>::None))
            .filter(product::Column::CategoryId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err("detach products"))?;
        category::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err("delete category"))?;

        Self::commit(txn).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        let rows = product::Entity::find()
            .order_by_asc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("list products"))?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_product(&self, id: Uuid) -> Result<Product, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("get product"))?
            .map(Product::try_from)
            .transpose()?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    async fn insert_product(&self, product: Product) -> Result<Product, ServiceError> {
        let model = product::ActiveModel::try_from(product)?
            .insert(&self.db)
            .await
            .map_err(db_err("insert product"))?;
        Product::try_from(model)
    }

    async fn update_product(&self, product: Product) -> Result<Product, ServiceError> {
        self.get_product(product.id).await?;
        let model = product::ActiveModel::try_from(product)?
            .update(&self.db)
            .await
            .map_err(db_err("update product"))?;
        Product::try_from(model)
    }

    async fn swap_product_order(&self, a: Uuid, b: Uuid) -> Result<(), ServiceError> {
        let txn = self.begin().await?;
        let first = product::Entity::find_by_id(a)
            .one(&txn)
            .await
            .map_err(db_err("get product"))?
            .ok_or_else(|| ServiceError::not_found("Product", a))?;
        let second = product::Entity::find_by_id(b)
            .one(&txn)
            .await
            .map_err(db_err("get product"))?
            .ok_or_else(|| ServiceError::not_found("Product", b))?;

        let (first_order, second_order) = (first.display_order, second.display_order);
        let mut first: product::ActiveModel = first.into();
        first.display_order = sea_orm::Set(second_order);
        first.update(&txn).await.map_err(db_err("swap products"))?;
        let mut second: product::ActiveModel = second.into();
        second.display_order = sea_orm::Set(first_order);
        second.update(&txn).await.map_err(db_err("swap products"))?;

        Self::commit(txn).await
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err("delete product"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Product", id));
        }
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, ServiceError> {
        let rows = profile::Entity::find()
            .order_by_asc(profile::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err("list profiles"))?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn get_profile(&self, id: Uuid) -> Result<Profile, ServiceError> {
        profile::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("get profile"))?
            .map(Profile::try_from)
            .transpose()?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, ServiceError> {
        let model = profile::ActiveModel::from(profile)
            .insert(&self.db)
            .await
            .map_err(db_err("insert profile"))?;
        Profile::try_from(model)
    }

    async fn update_profile(&self, profile: Profile) -> Result<Profile, ServiceError> {
        self.get_profile(profile.id).await?;
        let model = profile::ActiveModel::from(profile)
            .update(&self.db)
            .await
            .map_err(db_err("update profile"))?;
        Profile::try_from(model)
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<OrderRecord>, ServiceError> {
        let mut query = order::Entity::find();
        if let Some(uid) = user_id {
            query = query.filter(order::Column::UserId.eq(uid));
        }
        let rows = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_asc(order::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("list orders"))?;

        let mut items = self.items_for(rows.iter().map(|o| o.id).collect()).await?;
        rows.into_iter()
            .map(|row| {
                let order = Order::try_from(row)?;
                let items = items.remove(&order.id).unwrap_or_default();
                Ok(OrderRecord { order, items })
            })
            .collect()
    }

    async fn get_order(&self, id: Uuid) -> Result<OrderRecord, ServiceError> {
        let row = order::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("get order"))?
            .ok_or_else(|| ServiceError::not_found("Order", id))?;
        let order = Order::try_from(row)?;
        let items = self.items_for(vec![id]).await?.remove(&id).unwrap_or_default();
        Ok(OrderRecord { order, items })
    }

    #[instrument(skip(self, record, consumption), fields(order_id = %record.order.id))]
    async fn commit_order(
        &self,
        record: OrderRecord,
        consumption: Vec<StockConsumption>,
        policy: StockPolicy,
    ) -> Result<(OrderRecord, Vec<StockChange>), ServiceError> {
        let txn = self.begin().await?;

        let product_ids: Vec<Uuid> = consumption
            .iter()
            .map(|c| c.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut products = if product_ids.is_empty() {
            Vec::new()
        } else {
            product::Entity::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&txn)
                .await
                .map_err(db_err("load products"))?
                .into_iter()
                .map(Product::try_from)
                .collect::<Result<Vec<_>, _>>()?
        };

        let changes = stock::apply_consumption(&mut products, &consumption, policy)?;

        let touched: HashSet<Uuid> = changes.iter().map(|c| c.product_id).collect();
        for product in products.into_iter().filter(|p| touched.contains(&p.id)) {
            product::ActiveModel::try_from(product)?
                .update(&txn)
                .await
                .map_err(db_err("update stock"))?;
        }

        order::ActiveModel::from(record.order.clone())
            .insert(&txn)
            .await
            .map_err(db_err("insert order"))?;
        if !record.items.is_empty() {
            let items = record
                .items
                .iter()
                .cloned()
                .map(order_item::ActiveModel::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            order_item::Entity::insert_many(items)
                .exec(&txn)
                .await
                .map_err(db_err("insert order items"))?;
        }

        Self::commit(txn).await?;
        Ok((record, changes))
    }

    async fn update_order(&self, order: Order) -> Result<Order, ServiceError> {
        order::Entity::find_by_id(order.id)
            .one(&self.db)
            .await
            .map_err(db_err("get order"))?
            .ok_or_else(|| ServiceError::not_found("Order", order.id))?;
        let model = order::ActiveModel::from(order)
            .update(&self.db)
            .await
            .map_err(db_err("update order"))?;
        Order::try_from(model)
    }

    async fn list_news(&self, published: Option<bool>) -> Result<Vec<NewsPost>, ServiceError> {
        let mut query = news_post::Entity::find();
        if let Some(flag) = published {
            query = query.filter(news_post::Column::Published.eq(flag));
        }
        let rows = query
            .order_by_desc(news_post::Column::CreatedAt)
            .order_by_asc(news_post::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("list news"))?;
        Ok(rows.into_iter().map(NewsPost::from).collect())
    }

    async fn get_news(&self, id: Uuid) -> Result<NewsPost, ServiceError> {
        news_post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("get news"))?
            .map(NewsPost::from)
            .ok_or_else(|| ServiceError::not_found("News post", id))
    }

    async fn insert_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        let model = news_post::ActiveModel::from(post)
            .insert(&self.db)
            .await
            .map_err(db_err("insert news"))?;
        Ok(model.into())
    }

    async fn update_news(&self, post: NewsPost) -> Result<NewsPost, ServiceError> {
        self.get_news(post.id).await?;
        let model = news_post::ActiveModel::from(post)
            .update(&self.db)
            .await
            .map_err(db_err("update news"))?;
        Ok(model.into())
    }

    async fn delete_news(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = news_post::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err("delete news"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("News post", id));
        }
        Ok(())
    }
}
