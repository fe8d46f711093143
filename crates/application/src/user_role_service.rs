//! User listing and role assignment.

use std::sync::Arc;

use tracing::{info, warn};

use fleetops_core::AppResult;
use fleetops_domain::{DEFAULT_ROLE_NAME, avatar_color, email_local_part, initials};

use crate::{IdentityCache, Notice, Notifier, ProfileRepository, RoleManager};

/// User row with derived display attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email, empty when unknown.
    pub email: String,
    /// Assigned role name.
    pub role: String,
    /// Up to two uppercase initials.
    pub initials: String,
    /// Badge color from the avatar palette.
    pub color: &'static str,
}

/// Application service for assigning roles to users.
#[derive(Clone)]
pub struct UserRoleService {
    profiles: Arc<dyn ProfileRepository>,
    role_manager: RoleManager,
    identity_cache: IdentityCache,
    notifier: Arc<dyn Notifier>,
}

impl UserRoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        role_manager: RoleManager,
        identity_cache: IdentityCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            profiles,
            role_manager,
            identity_cache,
            notifier,
        }
    }

    /// Lists users with their role and display attributes.
    pub async fn list_users(&self) -> AppResult<Vec<UserData>> {
        let profiles = self.profiles.list_profiles().await?;

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let email = profile.email.unwrap_or_default();
                let name = profile
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| email_local_part(email.as_str()).to_owned());
                UserData {
                    initials: initials(name.as_str(), email.as_str()),
                    color: avatar_color(profile.user_id.as_str()),
                    role: profile
                        .role
                        .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_owned()),
                    id: profile.user_id,
                    name,
                    email,
                }
            })
            .collect())
    }

    /// Assigns a role to a user by role id.
    ///
    /// The role name is what gets stored on the profile. On failure the
    /// caller should re-fetch users instead of trusting local state.
    pub async fn set_user_role(&self, user_id: &str, role_id: &str) -> AppResult<()> {
        let role = self.role_manager.role(role_id).await?;

        if let Err(error) = self
            .profiles
            .update_user_role(user_id, role.name.as_str())
            .await
        {
            warn!(
                user_id = %user_id,
                role = %role.name,
                error = %error,
                "role assignment failed"
            );
            self.notifier
                .notify(Notice::error(format!("Role assignment failed: {}", error.message())));
            return Err(error);
        }

        self.identity_cache.invalidate(user_id).await;
        info!(user_id = %user_id, role = %role.name, "role assigned");
        self.notifier
            .notify(Notice::success(format!("Role '{}' assigned", role.name)));
        Ok(())
    }
}

#[cfg(test)]
mod tests;
