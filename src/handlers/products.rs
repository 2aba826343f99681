use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{created, ok, ApiResult, CreatedResult, MoveRequest};
use crate::errors::ServiceError;
use crate::models::{NewProduct, Product, ProductPatch, ProductView};
use crate::AppState;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrdering {
    /// Catalog browsing.
    #[default]
    Name,
    /// Admin ordering: category position, then display order.
    Category,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub available_only: bool,
    #[serde(default)]
    pub ordering: ProductOrdering,
}

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/move", post(move_product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<ProductView>> {
    let catalog = &state.services.catalog;
    let products = match query.ordering {
        ProductOrdering::Name => catalog.list_products(query.available_only).await?,
        ProductOrdering::Category => {
            let mut products = catalog.list_products_by_category().await?;
            if query.available_only {
                products.retain(|view| view.product.is_available);
            }
            products
        }
    };
    Ok(ok(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductView> {
    Ok(ok(state.services.catalog.get_product(id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> CreatedResult<Product> {
    let product = state.services.catalog.create_product(request).await?;
    Ok(created(product))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProductPatch>,
) -> ApiResult<Product> {
    Ok(ok(state.services.catalog.update_product(id, patch).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Vec<Product>> {
    let ordering = state
        .services
        .catalog
        .reorder_product(id, request.direction)
        .await?;
    Ok(ok(ordering))
}
