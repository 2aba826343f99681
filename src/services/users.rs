use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{NewProfile, Profile, ProfilePatch};
use crate::store::Store;

/// Member profiles.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Profiles sorted by full name.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<Profile>, ServiceError> {
        let mut profiles = self.store.list_profiles().await?;
        profiles.sort_by(|a, b| {
            a.full_name
                .to_lowercase()
                .cmp(&b.full_name.to_lowercase())
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(profiles)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<Profile, ServiceError> {
        self.store.get_profile(id).await
    }

    fn ensure_unique(
        profiles: &[Profile],
        except: Option<Uuid>,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<(), ServiceError> {
        for other in profiles.iter().filter(|p| Some(p.id) != except) {
            if email.is_some_and(|e| other.email.eq_ignore_ascii_case(e)) {
                return Err(ServiceError::Conflict(format!(
                    "Email {} is already registered",
                    other.email
                )));
            }
            if username.is_some_and(|u| other.username == u) {
                return Err(ServiceError::Conflict(format!(
                    "Username {} is already taken",
                    other.username
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create_user(&self, new: NewProfile) -> Result<Profile, ServiceError> {
        new.validate()?;
        let email = new.email.trim().to_lowercase();
        let username = new.username.trim().to_string();
        let full_name = new.full_name.trim().to_string();
        if username.is_empty() || full_name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Username and full name cannot be blank".to_string(),
            ));
        }

        let existing = self.store.list_profiles().await?;
        Self::ensure_unique(&existing, None, Some(&email), Some(&username))?;

        let profile = self
            .store
            .insert_profile(Profile {
                id: Uuid::new_v4(),
                email,
                full_name,
                username,
                role: new.role,
                created_at: Utc::now(),
            })
            .await?;
        info!(user_id = %profile.id, role = %profile.role, "Member created");
        Ok(profile)
    }

    #[instrument(skip(self, patch), fields(user_id = %id))]
    pub async fn update_user(&self, id: Uuid, patch: ProfilePatch) -> Result<Profile, ServiceError> {
        patch.validate()?;
        let mut profile = self.store.get_profile(id).await?;

        if let Some(full_name) = patch.full_name {
            let full_name = full_name.trim().to_string();
            if full_name.is_empty() {
                return Err(ServiceError::ValidationError("Full name cannot be blank".to_string()));
            }
            profile.full_name = full_name;
        }
        if let Some(username) = patch.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(ServiceError::ValidationError("Username cannot be blank".to_string()));
            }
            let existing = self.store.list_profiles().await?;
            Self::ensure_unique(&existing, Some(id), None, Some(&username))?;
            profile.username = username;
        }
        if let Some(role) = patch.role {
            profile.role = role;
        }

        let profile = self.store.update_profile(profile).await?;
        info!(user_id = %id, "Member updated");
        Ok(profile)
    }
}
