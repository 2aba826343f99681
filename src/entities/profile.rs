use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::parse_label;
use crate::errors::ServiceError;
use crate::models::Profile;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: String,
    #[sea_orm(unique)]
    pub username: String,
    /// user | admin
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Profile {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            username: model.username,
            role: parse_label(&model.role, "role")?,
            created_at: model.created_at,
        })
    }
}

impl From<Profile> for ActiveModel {
    fn from(profile: Profile) -> Self {
        ActiveModel {
            id: Set(profile.id),
            email: Set(profile.email),
            full_name: Set(profile.full_name),
            username: Set(profile.username),
            role: Set(profile.role.to_string()),
            created_at: Set(profile.created_at),
        }
    }
}
