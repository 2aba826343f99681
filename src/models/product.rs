use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{deserialize_some, money};
use crate::errors::ServiceError;

/// How a product tracks its inventory.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockMode {
    #[default]
    None,
    Simple,
    Variants,
}

/// A named, separately counted sub-option of a product (e.g. a size).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockVariant {
    pub name: String,
    pub quantity: u32,
}

/// Inventory state of a product. The mode and its counters travel together,
/// so a simple counter and a variant list can never both be populated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stock_mode", rename_all = "snake_case")]
pub enum Stock {
    #[default]
    #[serde(rename = "none")]
    Untracked,
    Simple {
        stock_quantity: u32,
    },
    Variants {
        stock_variants: Vec<StockVariant>,
    },
}

impl Stock {
    pub fn mode(&self) -> StockMode {
        match self {
            Stock::Untracked => StockMode::None,
            Stock::Simple { .. } => StockMode::Simple,
            Stock::Variants { .. } => StockMode::Variants,
        }
    }

    pub fn variant(&self, name: &str) -> Option<&StockVariant> {
        match self {
            Stock::Variants { stock_variants } => stock_variants.iter().find(|v| v.name == name),
            _ => None,
        }
    }

    /// Remaining units for the counter a cart line would draw from.
    /// `None` when nothing is tracked for that line.
    pub fn remaining(&self, variant: Option<&str>) -> Option<u32> {
        match (self, variant) {
            (Stock::Simple { stock_quantity }, _) => Some(*stock_quantity),
            (Stock::Variants { .. }, Some(name)) => self.variant(name).map(|v| v.quantity),
            _ => None,
        }
    }

    /// Builds the stock from the flat wire fields, checking that they agree with the mode.
    pub fn from_parts(
        mode: StockMode,
        quantity: Option<u32>,
        variants: Option<Vec<StockVariant>>,
    ) -> Result<Self, ServiceError> {
        match mode {
            StockMode::None => Ok(Stock::Untracked),
            StockMode::Simple => Ok(Stock::Simple {
                stock_quantity: quantity.unwrap_or(0),
            }),
            StockMode::Variants => {
                let stock_variants = variants.unwrap_or_default();
                let mut seen = HashSet::new();
                for variant in &stock_variants {
                    if variant.name.trim().is_empty() {
                        return Err(ServiceError::ValidationError(
                            "Variant names cannot be empty".to_string(),
                        ));
                    }
                    if !seen.insert(variant.name.as_str()) {
                        return Err(ServiceError::ValidationError(format!(
                            "Duplicate variant name: {}",
                            variant.name
                        )));
                    }
                }
                Ok(Stock::Variants { stock_variants })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_available: bool,
    /// Position within the product's category
    pub display_order: i32,
    #[serde(flatten)]
    pub stock: Stock,
    pub created_at: DateTime<Utc>,
}

/// A product joined with its category's display name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub stock_mode: StockMode,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
    #[serde(default)]
    pub stock_variants: Option<Vec<StockVariant>>,
}

fn default_available() -> bool {
    true
}

impl NewProduct {
    pub fn stock(&self) -> Result<Stock, ServiceError> {
        Stock::from_parts(
            self.stock_mode,
            self.stock_quantity,
            self.stock_variants.clone(),
        )
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 200, message = "Product name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub display_order: Option<i32>,
    /// Switches the stock mode; counters come from the fields below
    #[serde(default)]
    pub stock_mode: Option<StockMode>,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
    #[serde(default)]
    pub stock_variants: Option<Vec<StockVariant>>,
}

impl ProductPatch {
    /// Resolves the stock after the patch, keeping counters the patch does not mention.
    pub fn resolve_stock(&self, current: &Stock) -> Result<Stock, ServiceError> {
        let mode = self.stock_mode.unwrap_or_else(|| current.mode());
        let quantity = self.stock_quantity.or(match current {
            Stock::Simple { stock_quantity } => Some(*stock_quantity),
            _ => None,
        });
        let variants = self.stock_variants.clone().or_else(|| match current {
            Stock::Variants { stock_variants } => Some(stock_variants.clone()),
            _ => None,
        });
        Stock::from_parts(mode, quantity, variants)
    }
}

/// Prices are non-negative euros with cent precision.
pub fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    if !money::has_cent_precision(price) {
        return Err(ServiceError::ValidationError(
            "Price must have at most two decimal places".to_string(),
        ));
    }
    if price > money::MAX_AMOUNT {
        return Err(ServiceError::ValidationError(format!(
            "Price cannot exceed {}",
            money::MAX_AMOUNT
        )));
    }
    Ok(())
}
