use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::parse_label;
use crate::errors::ServiceError;
use crate::models::money;
use crate::models::Order;

/// Orders are never deleted; only status and timestamps change.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_amount: Decimal,
    pub status: String,
    pub payment_initiated_at: Option<DateTime<Utc>>,
    pub payment_notified_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id"
    )]
    Profile,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Order {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Order {
            id: model.id,
            user_id: model.user_id,
            total_amount: money::to_cents(model.total_amount),
            status: parse_label(&model.status, "status")?,
            payment_initiated_at: model.payment_initiated_at,
            payment_notified_at: model.payment_notified_at,
            confirmed_at: model.confirmed_at,
            created_at: model.created_at,
        })
    }
}

impl From<Order> for ActiveModel {
    fn from(order: Order) -> Self {
        ActiveModel {
            id: Set(order.id),
            user_id: Set(order.user_id),
            total_amount: Set(order.total_amount),
            status: Set(order.status.to_string()),
            payment_initiated_at: Set(order.payment_initiated_at),
            payment_notified_at: Set(order.payment_notified_at),
            confirmed_at: Set(order.confirmed_at),
            created_at: Set(order.created_at),
        }
    }
}
