use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{created, ok, ApiResult, CreatedResult, MoveRequest};
use crate::errors::ServiceError;
use crate::models::{Category, CategoryPatch, NewCategory};
use crate::AppState;

pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/:id/move", post(move_category))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(ok(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Category> {
    Ok(ok(state.services.catalog.get_category(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<NewCategory>,
) -> CreatedResult<Category> {
    let category = state.services.catalog.create_category(request).await?;
    Ok(created(category))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CategoryPatch>,
) -> ApiResult<Category> {
    Ok(ok(state.services.catalog.update_category(id, patch).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Swaps the category with its neighbour and returns the new ordering.
async fn move_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Vec<Category>> {
    let ordering = state
        .services
        .catalog
        .reorder_category(id, request.direction)
        .await?;
    Ok(ok(ordering))
}
