use super::*;

use tracing::info;

use fleetops_domain::{role_names_match, validate_role_name};

impl RoleManager {
    /// Creates a custom role with every permission disabled.
    ///
    /// The name is checked against the known roles before any backend call;
    /// an empty cache is filled from the backend first.
    pub async fn create_role(&self, name: &str, description: &str) -> AppResult<Role> {
        self.ensure_loaded().await?;
        let name = {
            let roles = self.roles.read().await;
            validate_role_name(name, roles.iter().map(|role| role.name.as_str()))?
        };
        let description = description.trim();

        let record = match self
            .repository
            .create_role(name.as_str(), description)
            .await
        {
            Ok(record) => record,
            Err(error) => {
                warn!(role = %name.as_str(), error = %error, "role creation failed");
                self.notifier
                    .notify(Notice::error(format!("Role creation failed: {}", error.message())));
                return Err(error);
            }
        };

        let role = Role::new(
            record.role_id,
            record.name,
            record.description.unwrap_or_else(|| description.to_owned()),
            false,
        );
        self.roles.write().await.push(role.clone());

        info!(role_id = %role.id, role = %role.name, "role created");
        self.notifier
            .notify(Notice::success(format!("Role '{}' created", role.name)));
        Ok(role)
    }

    /// Creates a new role carrying every permission enabled on the source.
    ///
    /// Grants are copied one call at a time; on failure the partial copy is
    /// deleted.
    pub async fn copy_role(&self, source_role_id: &str, new_name: &str) -> AppResult<Role> {
        let source = self.role(source_role_id).await?;
        let copy = self
            .create_role(new_name, source.description.as_str())
            .await?;

        for key in source.enabled_permissions() {
            if let Err(error) = self.apply_permission(copy.id.as_str(), key, true).await {
                warn!(
                    source = %source.name,
                    role = %copy.name,
                    permission = %key,
                    error = %error,
                    "role copy failed midway, deleting partial copy"
                );
                if let Err(delete_error) = self.repository.delete_role(copy.id.as_str()).await {
                    warn!(
                        role_id = %copy.id,
                        error = %delete_error,
                        "failed to delete partial role copy"
                    );
                }
                self.recover_after_failure("Role copy", &error).await;
                return Err(error);
            }
        }

        info!(source = %source.name, role = %copy.name, "role copied");
        self.role(copy.id.as_str()).await
    }

    /// Renames a custom role and replaces its description.
    pub async fn update_role(
        &self,
        role_id: &str,
        name: &str,
        description: &str,
    ) -> AppResult<Role> {
        let role = self.role(role_id).await?;
        role.ensure_editable()?;

        let name = {
            let roles = self.roles.read().await;
            validate_role_name(
                name,
                roles
                    .iter()
                    .filter(|candidate| candidate.id != role.id)
                    .map(|candidate| candidate.name.as_str()),
            )?
        };
        let description = description.trim();

        if let Err(error) = self
            .repository
            .update_role(role_id, name.as_str(), description)
            .await
        {
            warn!(role_id = %role_id, error = %error, "role update failed");
            self.recover_after_failure("Role update", &error).await;
            return Err(error);
        }

        self.update_cached_role(role_id, |cached| {
            cached.name = name.as_str().to_owned();
            cached.description = description.to_owned();
        })
        .await;

        info!(role_id = %role_id, previous = %role.name, role = %name.as_str(), "role updated");
        self.role(role_id).await
    }

    /// Deletes a custom role that no user is assigned to.
    ///
    /// Assignment is checked by role name against the current profiles.
    pub async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        let role = self.role(role_id).await?;
        if role.is_built_in {
            return Err(AppError::Forbidden(format!(
                "role '{}' is built-in and cannot be deleted",
                role.name
            )));
        }

        let assigned = self
            .profiles
            .list_profiles()
            .await?
            .iter()
            .filter_map(|profile| profile.role.as_deref())
            .filter(|assigned| role_names_match(assigned, role.name.as_str()))
            .count();
        if assigned > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is assigned to {assigned} user(s) and cannot be deleted",
                role.name
            )));
        }

        if let Err(error) = self.repository.delete_role(role_id).await {
            warn!(role_id = %role_id, error = %error, "role deletion failed");
            self.notifier
                .notify(Notice::error(format!("Role deletion failed: {}", error.message())));
            return Err(error);
        }

        self.roles.write().await.retain(|cached| cached.id != role_id);
        info!(role_id = %role_id, role = %role.name, "role deleted");
        self.notifier
            .notify(Notice::success(format!("Role '{}' deleted", role.name)));
        Ok(())
    }
}
