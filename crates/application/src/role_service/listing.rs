use super::*;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use fleetops_domain::{PermissionCatalog, role_names_match};

/// Grant summary of one category for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    /// Category name.
    pub category: &'static str,
    /// Granted permissions in the category.
    pub enabled: usize,
    /// Permissions in the category.
    pub total: usize,
    /// Whether every permission in the category is granted.
    pub all_enabled: bool,
}

/// Differences between the backend permission table and the local catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDrift {
    /// Backend permissions the catalog does not know.
    pub unknown_to_catalog: Vec<String>,
    /// Catalog permissions missing from the backend.
    pub missing_on_backend: Vec<String>,
}

impl CatalogDrift {
    /// Returns whether backend and catalog agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_to_catalog.is_empty() && self.missing_on_backend.is_empty()
    }
}

impl RoleManager {
    /// Fetches every role with its permission matrix and refreshes the cache.
    ///
    /// Grants on keys outside the catalog are dropped with a warning.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let records = self.repository.list_roles().await?;
        let edges = self.repository.list_role_permissions().await?;

        let mut grants: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &edges {
            grants
                .entry(edge.role_id.as_str())
                .or_default()
                .push(edge.permission_name.as_str());
        }

        let profiles = match self.profiles.list_profiles().await {
            Ok(profiles) => profiles,
            Err(error) => {
                warn!(error = %error, "failed to load profiles for role user counts");
                Vec::new()
            }
        };

        let roles: Vec<Role> = records
            .into_iter()
            .map(|record| {
                let granted = grants
                    .get(record.role_id.as_str())
                    .cloned()
                    .unwrap_or_default();
                let mut role = Role::new(
                    record.role_id,
                    record.name,
                    record.description.unwrap_or_default(),
                    record.is_built_in,
                );

                let unknown = role.apply_grants(granted);
                if !unknown.is_empty() {
                    warn!(
                        role = %role.name,
                        unknown = ?unknown,
                        "ignoring grants outside the permission catalog"
                    );
                }

                role.user_count = profiles
                    .iter()
                    .filter_map(|profile| profile.role.as_deref())
                    .filter(|assigned| role_names_match(assigned, role.name.as_str()))
                    .count();
                role
            })
            .collect();

        debug!(count = roles.len(), "roles loaded");
        *self.roles.write().await = roles.clone();
        Ok(roles)
    }

    /// Summarises grants per catalog category for a role.
    #[must_use]
    pub fn category_summary(role: &Role) -> Vec<CategorySummary> {
        PermissionCatalog::categories()
            .iter()
            .map(|category| CategorySummary {
                category: category.name,
                enabled: role.count_enabled_in_category(category),
                total: category.len(),
                all_enabled: role.all_enabled_in_category(category),
            })
            .collect()
    }

    /// Compares the backend permission table with the local catalog.
    pub async fn catalog_drift(&self) -> AppResult<CatalogDrift> {
        let backend: BTreeSet<String> = self
            .repository
            .list_permissions()
            .await?
            .into_iter()
            .map(|permission| permission.name)
            .collect();

        let drift = CatalogDrift {
            unknown_to_catalog: backend
                .iter()
                .filter(|name| !PermissionCatalog::contains(name))
                .cloned()
                .collect(),
            missing_on_backend: PermissionCatalog::all_keys()
                .filter(|key| !backend.contains(*key))
                .map(str::to_owned)
                .collect(),
        };

        if !drift.is_empty() {
            warn!(
                unknown_to_catalog = ?drift.unknown_to_catalog,
                missing_on_backend = ?drift.missing_on_backend,
                "permission catalog differs from backend"
            );
        }

        Ok(drift)
    }
}
