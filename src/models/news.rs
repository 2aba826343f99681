use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::deserialize_some;

const EXCERPT_LEN: usize = 160;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub author_id: Option<Uuid>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewNewsPost {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewsPatch {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    #[serde(default)]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub excerpt: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
}

/// First characters of the content, cut on a word boundary.
pub fn derive_excerpt(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() <= EXCERPT_LEN {
        return content.to_string();
    }
    let cut: String = content.chars().take(EXCERPT_LEN).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}
