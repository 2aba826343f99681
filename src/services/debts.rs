use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{money, Order, OrderStatus, Profile, UNKNOWN_USER};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatistics {
    pub total_users: u64,
    pub total_orders: u64,
    /// Confirmed orders only.
    pub total_revenue: Decimal,
    pub pending_orders_count: u64,
    pub generated_at: DateTime<Utc>,
}

/// One member's outstanding debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummary {
    /// `None` groups orders whose member no longer exists.
    pub user_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: Option<String>,
    pub balance: Decimal,
    pub formatted_balance: String,
    pub pending_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub revenue: Decimal,
    pub formatted_revenue: String,
}

/// Sum of `total_amount` over the member's pending orders.
pub fn outstanding_balance(orders: &[Order], user_id: Uuid) -> Result<Decimal, ServiceError> {
    money::sum(
        orders
            .iter()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
            .map(|o| o.total_amount),
    )
}

/// Sum of `total_amount` over confirmed orders, optionally restricted to
/// orders created in `year`.
pub fn confirmed_revenue(orders: &[Order], year: Option<i32>) -> Result<Decimal, ServiceError> {
    money::sum(
        orders
            .iter()
            .filter(|o| o.status == OrderStatus::Confirmed)
            .filter(|o| year.map_or(true, |y| o.created_at.year() == y))
            .map(|o| o.total_amount),
    )
}

/// Twelve rows of confirmed revenue, January first.
pub fn monthly_revenue(orders: &[Order], year: i32) -> Result<Vec<MonthlyRevenue>, ServiceError> {
    let mut months = [Decimal::ZERO; 12];
    for order in orders
        .iter()
        .filter(|o| o.status == OrderStatus::Confirmed && o.created_at.year() == year)
    {
        money::accumulate(&mut months[order.created_at.month0() as usize], order.total_amount)?;
    }
    Ok(months
        .iter()
        .zip(1u32..)
        .map(|(revenue, month)| MonthlyRevenue {
            month,
            revenue: *revenue,
            formatted_revenue: money::format_amount(*revenue),
        })
        .collect())
}

/// Positive balances per member, largest first.
pub fn debt_summaries(orders: &[Order], profiles: &[Profile]) -> Result<Vec<DebtSummary>, ServiceError> {
    let known: HashMap<Uuid, &Profile> = profiles.iter().map(|p| (p.id, p)).collect();
    let mut totals: HashMap<Option<Uuid>, (Decimal, u64)> = HashMap::new();

    for order in orders.iter().filter(|o| o.status == OrderStatus::Pending) {
        let key = if known.contains_key(&order.user_id) {
            Some(order.user_id)
        } else {
            warn!(order_id = %order.id, user_id = %order.user_id, "Pending order references an unknown member");
            None
        };
        let entry = totals.entry(key).or_insert((Decimal::ZERO, 0));
        money::accumulate(&mut entry.0, order.total_amount)?;
        entry.1 += 1;
    }

    let mut summaries: Vec<DebtSummary> = totals
        .into_iter()
        .filter(|(_, (balance, _))| *balance > Decimal::ZERO)
        .map(|(user_id, (balance, pending_orders))| {
            let profile = user_id.and_then(|id| known.get(&id));
            DebtSummary {
                user_id,
                user_name: profile
                    .map(|p| p.display_name().to_string())
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
                user_email: profile.map(|p| p.email.clone()),
                balance,
                formatted_balance: money::format_amount(balance),
                pending_orders,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.balance
            .cmp(&a.balance)
            .then_with(|| a.user_name.cmp(&b.user_name))
    });
    Ok(summaries)
}

/// Read-side derivations over the full order set. Nothing is cached.
#[derive(Clone)]
pub struct DebtService {
    store: Arc<dyn Store>,
}

impl DebtService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .store
            .list_orders(user_id)
            .await?
            .into_iter()
            .map(|record| record.order)
            .collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn outstanding_balance(&self, user_id: Uuid) -> Result<Decimal, ServiceError> {
        self.store.get_profile(user_id).await?;
        let orders = self.orders(Some(user_id)).await?;
        outstanding_balance(&orders, user_id)
    }

    #[instrument(skip(self))]
    pub async fn confirmed_revenue(&self, year: Option<i32>) -> Result<Decimal, ServiceError> {
        let orders = self.orders(None).await?;
        confirmed_revenue(&orders, year)
    }

    #[instrument(skip(self))]
    pub async fn global_statistics(&self) -> Result<GlobalStatistics, ServiceError> {
        let profiles = self.store.list_profiles().await?;
        let orders = self.orders(None).await?;

        let stats = GlobalStatistics {
            total_users: profiles.len() as u64,
            total_orders: orders.len() as u64,
            total_revenue: confirmed_revenue(&orders, None)?,
            pending_orders_count: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count() as u64,
            generated_at: Utc::now(),
        };
        info!(
            total_orders = stats.total_orders,
            pending = stats.pending_orders_count,
            "Computed global statistics"
        );
        Ok(stats)
    }

    #[instrument(skip(self))]
    pub async fn debt_summaries(&self) -> Result<Vec<DebtSummary>, ServiceError> {
        let profiles = self.store.list_profiles().await?;
        let orders = self.orders(None).await?;
        debt_summaries(&orders, &profiles)
    }

    #[instrument(skip(self))]
    pub async fn monthly_revenue(&self, year: i32) -> Result<Vec<MonthlyRevenue>, ServiceError> {
        let orders = self.orders(None).await?;
        monthly_revenue(&orders, year)
    }
}
