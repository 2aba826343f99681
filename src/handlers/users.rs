use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{created, ok, ApiResult, CreatedResult};
use crate::models::{money, NewProfile, OrderView, Profile, ProfilePatch};
use crate::AppState;

/// A member's outstanding debt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub formatted_balance: String,
}

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/orders", get(list_user_orders))
        .route("/:id/balance", get(get_balance))
        .route("/:id/notify-payment", post(notify_payment))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<Profile>> {
    Ok(ok(state.services.users.list_users().await?))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Profile> {
    Ok(ok(state.services.users.get_user(id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewProfile>,
) -> CreatedResult<Profile> {
    Ok(created(state.services.users.create_user(request).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Profile> {
    Ok(ok(state.services.users.update_user(id, patch).await?))
}

async fn list_user_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderView>> {
    Ok(ok(state.services.orders.list_user_orders(id).await?))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BalanceResponse> {
    let balance = state.services.debts.outstanding_balance(id).await?;
    Ok(ok(BalanceResponse {
        user_id: id,
        balance,
        formatted_balance: money::format_amount(balance),
    }))
}

/// "I paid my debt": every pending order of the member moves on.
async fn notify_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderView>> {
    Ok(ok(state.services.orders.notify_payment_for_user(id).await?))
}
