use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::{parse_label, to_column, to_count};
use crate::errors::ServiceError;
use crate::models::money;
use crate::models::{Product, Stock, StockMode, StockVariant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub display_order: i32,
    /// none | simple | variants
    pub stock_mode: String,
    pub stock_quantity: Option<i32>,
    /// Ordered list of `{name, quantity}` when `stock_mode` is variants
    pub stock_variants: Option<Json>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let mode: StockMode = parse_label(&model.stock_mode, "stock_mode")?;
        let quantity = model
            .stock_quantity
            .map(|q| to_count(q, "stock_quantity"))
            .transpose()?;
        let variants = model
            .stock_variants
            .map(serde_json::from_value::<Vec<StockVariant>>)
            .transpose()?;

        Ok(Product {
            id: model.id,
            name: model.name,
            description: model.description,
            price: money::to_cents(model.price),
            category_id: model.category_id,
            image_url: model.image_url,
            is_available: model.is_available,
            display_order: model.display_order,
            stock: Stock::from_parts(mode, quantity, variants)?,
            created_at: model.created_at,
        })
    }
}

impl TryFrom<Product> for ActiveModel {
    type Error = ServiceError;

    fn try_from(product: Product) -> Result<Self, Self::Error> {
        let stock_mode = product.stock.mode().to_string();
        let (stock_quantity, stock_variants) = match product.stock {
            Stock::Untracked => (None, None),
            Stock::Simple { stock_quantity } => {
                (Some(to_column(stock_quantity, "stock_quantity")?), None)
            }
            Stock::Variants { stock_variants } => {
                (None, Some(serde_json::to_value(stock_variants)?))
            }
        };

        Ok(ActiveModel {
            id: Set(product.id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            category_id: Set(product.category_id),
            image_url: Set(product.image_url),
            is_available: Set(product.is_available),
            display_order: Set(product.display_order),
            stock_mode: Set(stock_mode),
            stock_quantity: Set(stock_quantity),
            stock_variants: Set(stock_variants),
            created_at: Set(product.created_at),
        })
    }
}
