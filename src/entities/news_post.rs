use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::models::NewsPost;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "news_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub author_id: Option<Uuid>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NewsPost {
    fn from(model: Model) -> Self {
        NewsPost {
            id: model.id,
            title: model.title,
            content: model.content,
            excerpt: model.excerpt,
            image_url: model.image_url,
            author_id: model.author_id,
            published: model.published,
            created_at: model.created_at,
        }
    }
}

impl From<NewsPost> for ActiveModel {
    fn from(post: NewsPost) -> Self {
        ActiveModel {
            id: Set(post.id),
            title: Set(post.title),
            content: Set(post.content),
            excerpt: Set(post.excerpt),
            image_url: Set(post.image_url),
            author_id: Set(post.author_id),
            published: Set(post.published),
            created_at: Set(post.created_at),
        }
    }
}
