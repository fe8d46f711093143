use super::*;

use tracing::info;

use fleetops_domain::{PermissionCatalog, PermissionKey};

impl RoleManager {
    /// Grants or revokes one permission on a custom role.
    ///
    /// The backend call is always issued, even when the cached role already
    /// shows the requested value. A backend failure reloads every role so the cache never drifts from
    /// the backend.
    pub async fn set_permission(&self, role_id: &str, key: &str, value: bool) -> AppResult<()> {
        let role = self.role(role_id).await?;
        role.ensure_editable()?;
        let key = PermissionKey::catalogued(key)?;

        if let Err(error) = self.apply_permission(role_id, key.as_str(), value).await {
            warn!(
                role = %role.name,
                permission = %key,
                error = %error,
                "permission update failed"
            );
            self.recover_after_failure("Permission update", &error).await;
            return Err(error);
        }

        info!(role = %role.name, permission = %key, value, "permission updated");
        Ok(())
    }

    /// Grants or revokes every permission of a category on a custom role.
    ///
    /// Keys are updated one call at a time. When one call fails, the keys
    /// already changed are reverted before the roles are reloaded.
    pub async fn set_category_permissions(
        &self,
        role_id: &str,
        category: &str,
        value: bool,
    ) -> AppResult<()> {
        let role = self.role(role_id).await?;
        role.ensure_editable()?;
        let category = PermissionCatalog::category(category).ok_or_else(|| {
            AppError::Validation(format!("unknown permission category '{category}'"))
        })?;

        let pending: Vec<&str> = category
            .keys()
            .filter(|key| role.is_enabled(key) != value)
            .collect();

        let mut applied = Vec::with_capacity(pending.len());
        for key in pending {
            if let Err(error) = self.apply_permission(role_id, key, value).await {
                warn!(
                    role = %role.name,
                    category = %category.name,
                    permission = %key,
                    applied = applied.len(),
                    error = %error,
                    "category update failed midway, reverting"
                );
                self.revert_permissions(role_id, &applied, !value).await;
                self.recover_after_failure("Category update", &error).await;
                return Err(error);
            }
            applied.push(key);
        }

        info!(
            role = %role.name,
            category = %category.name,
            value,
            changed = applied.len(),
            "category permissions updated"
        );
        Ok(())
    }

    /// Issues one backend grant or revoke and mirrors it in the cache.
    pub(super) async fn apply_permission(
        &self,
        role_id: &str,
        key: &str,
        value: bool,
    ) -> AppResult<()> {
        if value {
            self.repository.add_permission_to_role(role_id, key).await?;
        } else {
            self.repository
                .remove_permission_from_role(role_id, key)
                .await?;
        }

        self.update_cached_role(role_id, |role| {
            role.set_enabled(key, value);
        })
        .await;
        Ok(())
    }

    async fn revert_permissions(&self, role_id: &str, keys: &[&str], value: bool) {
        for key in keys.iter().rev() {
            if let Err(error) = self.apply_permission(role_id, key, value).await {
                warn!(
                    role_id = %role_id,
                    permission = %key,
                    error = %error,
                    "failed to revert permission"
                );
            }
        }
    }
}
