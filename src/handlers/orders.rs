use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{created, ok, ApiResult, CreatedResult};
use crate::models::{CreateOrderRequest, OrderStatus, OrderView};
use crate::services::PaymentIntent;
use crate::{ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
        .route("/:id/pay", post(initiate_payment))
        .route("/:id/notify-payment", post(notify_payment))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/cancel", post(cancel_order))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Vec<OrderView>> {
    Ok(ok(state.services.orders.list_orders(query.user_id).await?))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<OrderView> {
    Ok(ok(state.services.orders.get_order(id).await?))
}

/// Places an order; an empty `items` list records a manual debt.
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> CreatedResult<OrderView> {
    let order = state.services.orders.create_order(request).await?;
    Ok(created(order))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<OrderView> {
    let order = state
        .services
        .orders
        .advance_status(id, request.status)
        .await?;
    Ok(ok(order))
}

async fn initiate_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentIntent> {
    Ok(ok(state.services.orders.initiate_payment(id).await?))
}

async fn notify_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.notify_payment(id).await?;
    Ok(Json(ApiResponse::with_message(order, "Payment notified")))
}

async fn confirm_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.confirm_order(id).await?;
    Ok(Json(ApiResponse::with_message(order, "Order confirmed")))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderView> {
    let order = state.services.orders.cancel_order(id).await?;
    Ok(Json(ApiResponse::with_message(order, "Order cancelled")))
}
