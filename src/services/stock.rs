//! Stock ledger: applies the quantity decrements of a committed order.
//!
//! The ledger is a pure function over a slice of products so every store
//! backend can run it inside its own critical section (a database
//! transaction, or a write lock over the in-memory dataset).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{OrderItem, Product, Stock};

/// What happens when an order asks for more than what is left.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StockPolicy {
    /// Reserve optimistically and stop counters at zero.
    #[default]
    Clamp,
    /// Refuse the whole order when any counter would go below zero.
    Reject,
}

/// One line of stock demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConsumption {
    pub product_id: Uuid,
    pub quantity: u32,
    pub variant: Option<String>,
}

impl From<&OrderItem> for StockConsumption {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            variant: item.variant.clone(),
        }
    }
}

/// Record of one decremented counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: Uuid,
    pub variant: Option<String>,
    pub before: u32,
    pub after: u32,
    /// Units requested beyond what was left
    pub shortfall: u32,
}

impl StockChange {
    pub fn depleted(&self) -> bool {
        self.after == 0 && self.before > 0
    }

    pub fn clamped(&self) -> bool {
        self.shortfall > 0
    }
}

/// Decrements a counter, stopping at zero.
fn decrement(counter: &mut u32, consumed: u32) -> (u32, u32, u32) {
    let before = *counter;
    let after = before.saturating_sub(consumed);
    *counter = after;
    (before, after, consumed.saturating_sub(before))
}

/// Applies one consumption to one product. Returns `None` when the product
/// does not track stock or the named variant does not exist.
pub fn consume(
    product: &mut Product,
    quantity: u32,
    variant: Option<&str>,
) -> Option<StockChange> {
    let product_id = product.id;
    let (counter, variant) = match (&mut product.stock, variant) {
        (Stock::Untracked, _) => return None,
        (Stock::Simple { stock_quantity }, _) => (stock_quantity, None),
        (Stock::Variants { stock_variants }, Some(name)) => {
            match stock_variants.iter_mut().find(|v| v.name == name) {
                Some(entry) => (&mut entry.quantity, Some(name.to_string())),
                None => {
                    warn!(%product_id, variant = name, "unknown variant, stock left untouched");
                    return None;
                }
            }
        }
        (Stock::Variants { .. }, None) => {
            warn!(%product_id, "variant-tracked product consumed without a variant");
            return None;
        }
    };

    let (before, after, shortfall) = decrement(counter, quantity);
    Some(StockChange {
        product_id,
        variant,
        before,
        after,
        shortfall,
    })
}

/// Applies every consumption of an order to `products`.
///
/// All referenced products must be present, otherwise nothing is touched
/// and `NotFound` is returned. Under [`StockPolicy::Reject`] the demand of
/// lines hitting the same counter is summed and checked before any
/// mutation.
pub fn apply_consumption(
    products: &mut [Product],
    items: &[StockConsumption],
    policy: StockPolicy,
) -> Result<Vec<StockChange>, ServiceError> {
    let index: HashMap<Uuid, usize> = products
        .iter()
        .enumerate()
        .map(|(idx, product)| (product.id, idx))
        .collect();

    if let Some(missing) = items.iter().find(|i| !index.contains_key(&i.product_id)) {
        return Err(ServiceError::not_found("Product", missing.product_id));
    }

    if policy == StockPolicy::Reject {
        let mut demand: HashMap<(Uuid, Option<&str>), u64> = HashMap::new();
        for item in items {
            *demand
                .entry((item.product_id, item.variant.as_deref()))
                .or_default() += u64::from(item.quantity);
        }
        for ((product_id, variant), wanted) in demand {
            let product = &products[index[&product_id]];
            if let Some(left) = product.stock.remaining(variant) {
                if wanted > u64::from(left) {
                    return Err(ServiceError::InsufficientStock(format!(
                        "{}{}: {} requested, {} left",
                        product.name,
                        variant.map(|v| format!(" ({})", v)).unwrap_or_default(),
                        wanted,
                        left
                    )));
                }
            }
        }
    }

    let mut changes = Vec::new();
    for item in items {
        let product = &mut products[index[&item.product_id]];
        if let Some(change) = consume(product, item.quantity, item.variant.as_deref()) {
            if change.clamped() {
                warn!(
                    product_id = %change.product_id,
                    variant = ?change.variant,
                    shortfall = change.shortfall,
                    "stock clamped at zero"
                );
            }
            changes.push(change);
        }
    }
    Ok(changes)
}
