use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::category::slugify;
use crate::models::product::validate_price;
use crate::models::{
    Category, CategoryPatch, Direction, NewCategory, NewProduct, Product, ProductPatch,
    ProductView,
};
use crate::store::Store;

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Position after the largest of `orders`, or 1 when there are none.
fn next_display_order(orders: impl Iterator<Item = i32>) -> Result<i32, ServiceError> {
    orders.max().unwrap_or(0).checked_add(1).ok_or_else(|| {
        ServiceError::ValidationError(
            "No display_order left after the last entry; set one explicitly".to_string(),
        )
    })
}

/// Index of the neighbour one step `direction` away from `idx`, if any.
fn neighbour(idx: usize, len: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::Up => idx.checked_sub(1),
        Direction::Down => (idx + 1 < len).then_some(idx + 1),
    }
}

fn product_sort_key(product: &Product) -> (i32, chrono::DateTime<Utc>, Uuid) {
    (product.display_order, product.created_at, product.id)
}

/// Categories and products, with their display orderings.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Categories sorted by display order.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        self.store.list_categories().await
    }

    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError> {
        self.store.get_category(id).await
    }

    fn ensure_unique_category(
        categories: &[Category],
        except: Option<Uuid>,
        name: &str,
        slug: &str,
    ) -> Result<(), ServiceError> {
        for other in categories.iter().filter(|c| Some(c.id) != except) {
            if other.name.eq_ignore_ascii_case(name) {
                return Err(ServiceError::Conflict(format!(
                    "A category named {} already exists",
                    name
                )));
            }
            if other.slug == slug {
                return Err(ServiceError::Conflict(format!(
                    "A category with slug {} already exists",
                    slug
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(&self, request: NewCategory) -> Result<Category, ServiceError> {
        request.validate()?;
        let name = required(&request.name, "Category name")?;
        let slug = slugify(request.slug.as_deref().unwrap_or(&name));
        if slug.is_empty() {
            return Err(ServiceError::ValidationError("Slug cannot be empty".to_string()));
        }

        let existing = self.store.list_categories().await?;
        Self::ensure_unique_category(&existing, None, &name, &slug)?;
        let display_order = match request.display_order {
            Some(order) => order,
            None => next_display_order(existing.iter().map(|c| c.display_order))?,
        };

        let category = self
            .store
            .insert_category(Category {
                id: Uuid::new_v4(),
                name,
                slug,
                display_order,
                created_at: Utc::now(),
            })
            .await?;

        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Renaming a category recomputes its slug.
    #[instrument(skip(self, patch), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Category, ServiceError> {
        patch.validate()?;
        let mut category = self.store.get_category(id).await?;

        if let Some(name) = patch.name {
            let name = required(&name, "Category name")?;
            let slug = slugify(&name);
            let existing = self.store.list_categories().await?;
            Self::ensure_unique_category(&existing, Some(id), &name, &slug)?;
            category.name = name;
            category.slug = slug;
        }
        if let Some(display_order) = patch.display_order {
            category.display_order = display_order;
        }

        let category = self.store.update_category(category).await?;
        info!(category_id = %id, "Category updated");
        Ok(category)
    }

    /// Deletes a category; its products become uncategorized.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_category(id).await?;
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Swaps display order values with the adjacent category. Moving past
    /// either end changes nothing. Returns the resulting ordering.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn reorder_category(
        &self,
        id: Uuid,
        direction: Direction,
    ) -> Result<Vec<Category>, ServiceError> {
        let categories = self.store.list_categories().await?;
        let idx = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ServiceError::not_found("Category", id))?;

        let Some(other) = neighbour(idx, categories.len(), direction) else {
            return Ok(categories);
        };
        self.store.swap_category_order(id, categories[other].id).await?;
        info!(category_id = %id, with = %categories[other].id, "Categories swapped");
        self.store.list_categories().await
    }

    async fn category_names(&self) -> Result<HashMap<Uuid, Category>, ServiceError> {
        Ok(self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }

    fn view(product: Product, categories: &HashMap<Uuid, Category>) -> ProductView {
        let category_name = product
            .category_id
            .and_then(|id| categories.get(&id))
            .map(|c| c.name.clone());
        ProductView {
            product,
            category_name,
        }
    }

    /// Catalog browsing: sorted by name, each with its category name.
    #[instrument(skip(self))]
    pub async fn list_products(&self, available_only: bool) -> Result<Vec<ProductView>, ServiceError> {
        let categories = self.category_names().await?;
        let mut products: Vec<Product> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(|p| !available_only || p.is_available)
            .collect();
        products.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(products
            .into_iter()
            .map(|p| Self::view(p, &categories))
            .collect())
    }

    /// Admin ordering: by category position (uncategorized last), then the
    /// product's display order, then name.
    #[instrument(skip(self))]
    pub async fn list_products_by_category(&self) -> Result<Vec<ProductView>, ServiceError> {
        let categories = self.category_names().await?;
        let position: HashMap<Uuid, usize> = self
            .store
            .list_categories()
            .await?
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id, idx))
            .collect();

        let mut products = self.store.list_products().await?;
        products.sort_by(|a, b| {
            let rank = |p: &Product| {
                p.category_id
                    .and_then(|id| position.get(&id).copied())
                    .unwrap_or(usize::MAX)
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.display_order.cmp(&b.display_order))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(products
            .into_iter()
            .map(|p| Self::view(p, &categories))
            .collect())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductView, ServiceError> {
        let product = self.store.get_product(id).await?;
        let categories = self.category_names().await?;
        Ok(Self::view(product, &categories))
    }

    async fn ensure_category(&self, category_id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            self.store.get_category(id).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(&self, request: NewProduct) -> Result<Product, ServiceError> {
        request.validate()?;
        let name = required(&request.name, "Product name")?;
        validate_price(request.price)?;
        let stock = request.stock()?;
        self.ensure_category(request.category_id).await?;

        let display_order = match request.display_order {
            Some(order) => order,
            None => next_display_order(
                self.store
                    .list_products()
                    .await?
                    .iter()
                    .filter(|p| p.category_id == request.category_id)
                    .map(|p| p.display_order),
            )?,
        };

        let product = self
            .store
            .insert_product(Product {
                id: Uuid::new_v4(),
                name,
                description: request.description,
                price: request.price,
                category_id: request.category_id,
                image_url: request.image_url,
                is_available: request.is_available,
                display_order,
                stock,
                created_at: Utc::now(),
            })
            .await?;

        info!(product_id = %product.id, stock_mode = %product.stock.mode(), "Product created");
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, ServiceError> {
        patch.validate()?;
        let mut product = self.store.get_product(id).await?;

        product.stock = patch.resolve_stock(&product.stock)?;
        if let Some(name) = &patch.name {
            product.name = required(name, "Product name")?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            product.price = price;
        }
        if let Some(category_id) = patch.category_id {
            self.ensure_category(category_id).await?;
            product.category_id = category_id;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = image_url;
        }
        if let Some(is_available) = patch.is_available {
            product.is_available = is_available;
        }
        if let Some(display_order) = patch.display_order {
            product.display_order = display_order;
        }

        let product = self.store.update_product(product).await?;
        info!(product_id = %id, "Product updated");
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_product(id).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Same value swap as categories, among products of the same category.
    /// Returns the resulting ordering of that category's products.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn reorder_product(
        &self,
        id: Uuid,
        direction: Direction,
    ) -> Result<Vec<Product>, ServiceError> {
        let product = self.store.get_product(id).await?;
        let siblings = self.siblings(product.category_id).await?;
        let idx = siblings
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ServiceError::not_found("Product", id))?;

        let Some(other) = neighbour(idx, siblings.len(), direction) else {
            return Ok(siblings);
        };
        self.store.swap_product_order(id, siblings[other].id).await?;
        info!(product_id = %id, with = %siblings[other].id, "Products swapped");
        self.siblings(product.category_id).await
    }

    async fn siblings(&self, category_id: Option<Uuid>) -> Result<Vec<Product>, ServiceError> {
        let mut siblings: Vec<Product> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.category_id == category_id)
            .collect();
        siblings.sort_by_key(product_sort_key);
        Ok(siblings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stock, StockMode, StockVariant};
    use crate::store::{Dataset, MemoryStore};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::in_memory(Dataset::default())))
    }

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn new_product(name: &str, category_id: Option<Uuid>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: dec!(2.00),
            category_id,
            image_url: None,
            is_available: true,
            display_order: None,
            stock_mode: StockMode::None,
            stock_quantity: None,
            stock_variants: None,
        }
    }

    #[tokio::test]
    async fn categories_get_slug_and_next_display_order() {
        let catalog = service();
        let plats = catalog.create_category(new_category("Plats Chauds")).await.unwrap();
        let drinks = catalog.create_category(new_category("Boissons")).await.unwrap();

        assert_eq!(plats.slug, "plats-chauds");
        assert_eq!(plats.display_order, 1);
        assert_eq!(drinks.display_order, 2);
    }

    #[tokio::test]
    async fn category_after_the_last_position_is_rejected() {
        let catalog = service();
        catalog
            .create_category(NewCategory {
                display_order: Some(i32::MAX),
                ..new_category("A")
            })
            .await
            .unwrap();

        let result = catalog.create_category(new_category("B")).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));

        let explicit = catalog
            .create_category(NewCategory {
                display_order: Some(7),
                ..new_category("C")
            })
            .await
            .unwrap();
        assert_eq!(explicit.display_order, 7);
        assert_eq!(catalog.list_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn product_after_the_last_position_is_rejected() {
        let catalog = service();
        let plats = catalog.create_category(new_category("Plats")).await.unwrap();
        catalog
            .create_product(NewProduct {
                display_order: Some(i32::MAX),
                ..new_product("Harira", Some(plats.id))
            })
            .await
            .unwrap();

        let result = catalog.create_product(new_product("Makrout", Some(plats.id))).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));

        // Positions are scoped per category.
        let elsewhere = catalog.create_product(new_product("Makrout", None)).await.unwrap();
        assert_eq!(elsewhere.display_order, 1);
    }

    #[tokio::test]
    async fn duplicate_category_is_a_conflict() {
        let catalog = service();
        catalog.create_category(new_category("Plats")).await.unwrap();
        let result = catalog.create_category(new_category("plats")).await;
        assert_matches!(result, Err(ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn blank_category_name_is_rejected() {
        let catalog = service();
        let result = catalog.create_category(new_category("   ")).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn rename_recomputes_slug() {
        let catalog = service();
        let category = catalog.create_category(new_category("Plats")).await.unwrap();

        let renamed = catalog
            .update_category(
                category.id,
                CategoryPatch {
                    name: Some("Plats du Jour".into()),
                    display_order: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.slug, "plats-du-jour");
        assert_eq!(renamed.display_order, category.display_order);
    }

    #[tokio::test]
    async fn reorder_swaps_values_and_keeps_gaps() {
        let catalog = service();
        let a = catalog
            .create_category(NewCategory {
                name: "A".into(),
                display_order: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = catalog
            .create_category(NewCategory {
                name: "B".into(),
                display_order: Some(40),
                ..Default::default()
            })
            .await
            .unwrap();

        let ordering = catalog.reorder_category(a.id, Direction::Down).await.unwrap();

        assert_eq!(ordering[0].id, b.id);
        assert_eq!(ordering[0].display_order, 10);
        assert_eq!(ordering[1].id, a.id);
        assert_eq!(ordering[1].display_order, 40);
    }

    #[tokio::test]
    async fn reorder_past_the_edge_is_a_no_op() {
        let catalog = service();
        let a = catalog.create_category(new_category("A")).await.unwrap();
        let before = catalog.list_categories().await.unwrap();

        let after = catalog.reorder_category(a.id, Direction::Up).await.unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn reorder_unknown_category_is_not_found() {
        let catalog = service();
        let result = catalog.reorder_category(Uuid::new_v4(), Direction::Up).await;
        assert_matches!(result, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn products_carry_category_name() {
        let catalog = service();
        let drinks = catalog.create_category(new_category("Boissons")).await.unwrap();
        catalog
            .create_product(new_product("Thé", Some(drinks.id)))
            .await
            .unwrap();
        catalog.create_product(new_product("Affiche", None)).await.unwrap();

        let listed = catalog.list_products(false).await.unwrap();
        assert_eq!(listed[0].product.name, "Affiche");
        assert_eq!(listed[0].category_name, None);
        assert_eq!(listed[1].category_name.as_deref(), Some("Boissons"));
    }

    #[tokio::test]
    async fn available_filter_hides_unavailable_products() {
        let catalog = service();
        let mut hidden = new_product("Caché", None);
        hidden.is_available = false;
        catalog.create_product(hidden).await.unwrap();
        catalog.create_product(new_product("Visible", None)).await.unwrap();

        let listed = catalog.list_products(true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product.name, "Visible");
    }

    #[tokio::test]
    async fn admin_listing_puts_uncategorized_last() {
        let catalog = service();
        let first = catalog.create_category(new_category("Plats")).await.unwrap();
        let second = catalog.create_category(new_category("Boissons")).await.unwrap();
        catalog.create_product(new_product("Zèbre", None)).await.unwrap();
        catalog
            .create_product(new_product("Jus", Some(second.id)))
            .await
            .unwrap();
        catalog
            .create_product(new_product("Harira", Some(first.id)))
            .await
            .unwrap();

        let names: Vec<String> = catalog
            .list_products_by_category()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.product.name)
            .collect();
        assert_eq!(names, vec!["Harira", "Jus", "Zèbre"]);
    }

    #[tokio::test]
    async fn product_validation() {
        let catalog = service();

        let mut negative = new_product("Gratuit", None);
        negative.price = dec!(-1);
        assert_matches!(
            catalog.create_product(negative).await,
            Err(ServiceError::ValidationError(_))
        );

        let dangling = new_product("Orphelin", Some(Uuid::new_v4()));
        assert_matches!(
            catalog.create_product(dangling).await,
            Err(ServiceError::NotFound(_))
        );

        let mut variants = new_product("T-shirt", None);
        variants.stock_mode = StockMode::Variants;
        variants.stock_variants = Some(vec![
            StockVariant {
                name: "M".into(),
                quantity: 1,
            },
            StockVariant {
                name: "M".into(),
                quantity: 2,
            },
        ]);
        assert_matches!(
            catalog.create_product(variants).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn update_switches_stock_mode() {
        let catalog = service();
        let product = catalog.create_product(new_product("Jus", None)).await.unwrap();

        let updated = catalog
            .update_product(
                product.id,
                ProductPatch {
                    stock_mode: Some(StockMode::Simple),
                    stock_quantity: Some(6),
                    price: Some(dec!(2.50)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, Stock::Simple { stock_quantity: 6 });
        assert_eq!(updated.price, dec!(2.50));
    }

    #[tokio::test]
    async fn product_reorder_stays_within_category() {
        let catalog = service();
        let plats = catalog.create_category(new_category("Plats")).await.unwrap();
        let a = catalog
            .create_product(new_product("A", Some(plats.id)))
            .await
            .unwrap();
        let b = catalog
            .create_product(new_product("B", Some(plats.id)))
            .await
            .unwrap();
        let loose = catalog.create_product(new_product("C", None)).await.unwrap();

        let ordering = catalog.reorder_product(b.id, Direction::Up).await.unwrap();
        let ids: Vec<Uuid> = ordering.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let untouched = catalog.get_product(loose.id).await.unwrap();
        assert_eq!(untouched.product.display_order, 1);
    }

    #[tokio::test]
    async fn deleting_category_uncategorizes_products() {
        let catalog = service();
        let plats = catalog.create_category(new_category("Plats")).await.unwrap();
        let product = catalog
            .create_product(new_product("Harira", Some(plats.id)))
            .await
            .unwrap();

        catalog.delete_category(plats.id).await.unwrap();

        let view = catalog.get_product(product.id).await.unwrap();
        assert_eq!(view.product.category_id, None);
        assert_eq!(view.category_name, None);
    }
}
