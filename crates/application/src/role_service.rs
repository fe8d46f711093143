//! Role and permission administration.
//!
//! Keeps an in-memory copy of every role with its full permission matrix and
//! applies edits through the role repository. Multi-call edits (category
//! toggles, role copies) are not atomic on the backend, so a failure midway
//! triggers compensating calls followed by a full reload.

mod lifecycle;
mod listing;
mod permissions;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use fleetops_core::{AppError, AppResult};
use fleetops_domain::Role;

use crate::{Notice, Notifier, ProfileRepository, RoleRepository};

pub use listing::{CatalogDrift, CategorySummary};

/// Application service for role administration.
#[derive(Clone)]
pub struct RoleManager {
    repository: Arc<dyn RoleRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn Notifier>,
    roles: Arc<RwLock<Vec<Role>>>,
}

impl RoleManager {
    /// Creates a new role manager from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleRepository>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            profiles,
            notifier,
            roles: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns the roles loaded by the last listing.
    pub async fn roles(&self) -> Vec<Role> {
        self.roles.read().await.clone()
    }

    /// Returns one role, reloading once when it is not cached.
    pub async fn role(&self, role_id: &str) -> AppResult<Role> {
        if let Some(role) = self.cached_role(role_id).await {
            return Ok(role);
        }

        self.list_roles().await?;
        self.cached_role(role_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Loads roles when nothing has been listed yet.
    async fn ensure_loaded(&self) -> AppResult<()> {
        if self.roles.read().await.is_empty() {
            self.list_roles().await?;
        }
        Ok(())
    }

    async fn cached_role(&self, role_id: &str) -> Option<Role> {
        self.roles
            .read()
            .await
            .iter()
            .find(|role| role.id == role_id)
            .cloned()
    }

    async fn update_cached_role(&self, role_id: &str, update: impl FnOnce(&mut Role)) {
        if let Some(role) = self
            .roles
            .write()
            .await
            .iter_mut()
            .find(|role| role.id == role_id)
        {
            update(role);
        }
    }

    /// Reloads roles after a failed edit and reports the failure.
    async fn recover_after_failure(&self, action: &str, error: &AppError) {
        self.notifier
            .notify(Notice::error(format!("{action} failed: {}", error.message())));

        if let Err(reload_error) = self.list_roles().await {
            warn!(
                error = %reload_error,
                "failed to reload roles after a failed edit"
            );
        }
    }
}
