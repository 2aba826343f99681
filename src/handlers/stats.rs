use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::common::{ok, ApiResult};
use crate::models::money;
use crate::services::debts::{DebtSummary, GlobalStatistics, MonthlyRevenue};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueResponse {
    pub year: Option<i32>,
    pub revenue: Decimal,
    pub formatted_revenue: String,
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(global_statistics))
        .route("/debts", get(debt_summaries))
        .route("/revenue", get(confirmed_revenue))
        .route("/revenue/monthly", get(monthly_revenue))
}

async fn global_statistics(State(state): State<AppState>) -> ApiResult<GlobalStatistics> {
    Ok(ok(state.services.debts.global_statistics().await?))
}

async fn debt_summaries(State(state): State<AppState>) -> ApiResult<Vec<DebtSummary>> {
    Ok(ok(state.services.debts.debt_summaries().await?))
}

async fn confirmed_revenue(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<RevenueResponse> {
    let revenue = state.services.debts.confirmed_revenue(query.year).await?;
    Ok(ok(RevenueResponse {
        year: query.year,
        revenue,
        formatted_revenue: money::format_amount(revenue),
    }))
}

/// Defaults to the current calendar year.
async fn monthly_revenue(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Vec<MonthlyRevenue>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(ok(state.services.debts.monthly_revenue(year).await?))
}
