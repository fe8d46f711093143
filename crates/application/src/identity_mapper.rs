//! Maps backend users to application identities.
//!
//! A profile lookup outage must never block login, so every lookup failure
//! resolves to a default identity derived from the backend user.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use fleetops_core::Identity;
use fleetops_domain::{DEFAULT_ROLE_NAME, email_local_part};

use crate::{BackendUser, ProfileRepository};

/// Identity cache keyed by user id, shared by every holder of a clone.
#[derive(Clone, Default)]
pub struct IdentityCache {
    entries: Arc<RwLock<HashMap<String, Identity>>>,
}

impl IdentityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached identity for a user.
    pub async fn get(&self, user_id: &str) -> Option<Identity> {
        self.entries.read().await.get(user_id).cloned()
    }

    /// Stores an identity under its id.
    pub async fn insert(&self, identity: Identity) {
        self.entries
            .write()
            .await
            .insert(identity.id().to_owned(), identity);
    }

    /// Drops one user's entry.
    pub async fn invalidate(&self, user_id: &str) {
        self.entries.write().await.remove(user_id);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Returns the number of cached identities.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Resolves backend users into application identities with a profile lookup.
#[derive(Clone)]
pub struct IdentityMapper {
    profiles: Arc<dyn ProfileRepository>,
    cache: IdentityCache,
}

impl IdentityMapper {
    /// Creates a mapper over a profile repository and a shared cache.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, cache: IdentityCache) -> Self {
        Self { profiles, cache }
    }

    /// Returns the cache backing this mapper.
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Resolves a backend user. Never fails.
    pub async fn map_identity(&self, user: &BackendUser) -> Identity {
        if let Some(identity) = self.cache.get(user.id.as_str()).await {
            return identity;
        }

        let email = user.email.clone().unwrap_or_default();
        let default_name = user
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email_local_part(email.as_str()).to_owned());

        let (name, role) = match self.profiles.find_profile(user.id.as_str()).await {
            Ok(Some(profile)) => (
                profile
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(default_name),
                profile
                    .role
                    .filter(|role| !role.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_owned()),
            ),
            Ok(None) => {
                debug!(user_id = %user.id, "no profile found, using default identity");
                (default_name, DEFAULT_ROLE_NAME.to_owned())
            }
            Err(error) => {
                warn!(
                    user_id = %user.id,
                    error = %error,
                    "profile lookup failed, using default identity"
                );
                (default_name, DEFAULT_ROLE_NAME.to_owned())
            }
        };

        let identity = Identity::new(user.id.as_str(), email, name, role);
        self.cache.insert(identity.clone()).await;
        identity
    }

    /// Empties the cache. Called on sign-out.
    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}
