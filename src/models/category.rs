use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A catalog section ("Plats", "Boissons", ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    /// Derived from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    /// Appended after the last category when omitted
    #[serde(default)]
    pub display_order: Option<i32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 100, message = "Category name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// Direction of a one-step move in a display ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// URL-safe slug: lowercase, whitespace runs become a single hyphen.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

impl Category {
    /// Total sort key: display order, then creation time, then id.
    pub fn sort_key(&self) -> (i32, DateTime<Utc>, Uuid) {
        (self.display_order, self.created_at, self.id)
    }
}
