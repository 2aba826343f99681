use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A member of the association.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown next to orders and debts.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewProfile {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 60, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 120, message = "Full name cannot be empty"))]
    #[serde(default)]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 60, message = "Username cannot be empty"))]
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}
