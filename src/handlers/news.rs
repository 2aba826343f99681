use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{created, ok, ApiResult, CreatedResult};
use crate::errors::ServiceError;
use crate::models::{NewNewsPost, NewsPatch, NewsPost};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub published: Option<bool>,
}

pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news).post(create_news))
        .route("/:id", get(get_news).put(update_news).delete(delete_news))
}

async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> ApiResult<Vec<NewsPost>> {
    Ok(ok(state.services.news.list_news(query.published).await?))
}

async fn get_news(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<NewsPost> {
    Ok(ok(state.services.news.get_news(id).await?))
}

async fn create_news(
    State(state): State<AppState>,
    Json(request): Json<NewNewsPost>,
) -> CreatedResult<NewsPost> {
    Ok(created(state.services.news.create_news(request).await?))
}

async fn update_news(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<NewsPatch>,
) -> ApiResult<NewsPost> {
    Ok(ok(state.services.news.update_news(id, patch).await?))
}

async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.news.delete_news(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
