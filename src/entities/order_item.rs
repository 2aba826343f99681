use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::{to_column, to_count};
use crate::errors::ServiceError;
use crate::models::money;
use crate::models::OrderItem;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    /// Weak reference: the product may since have been deleted
    pub product_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,
    pub variant: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for OrderItem {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: to_count(model.quantity, "quantity")?,
            unit_price: money::to_cents(model.unit_price),
            total_price: money::to_cents(model.total_price),
            variant: model.variant,
        })
    }
}

impl TryFrom<OrderItem> for ActiveModel {
    type Error = ServiceError;

    fn try_from(item: OrderItem) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            id: Set(item.id),
            order_id: Set(item.order_id),
            product_id: Set(item.product_id),
            quantity: Set(to_column(item.quantity, "quantity")?),
            unit_price: Set(item.unit_price),
            total_price: Set(item.total_price),
            variant: Set(item.variant),
        })
    }
}
