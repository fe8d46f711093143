use async_trait::async_trait;

use fleetops_core::AppResult;

use super::profiles::ProfileRecord;
use super::roles::{PermissionRecord, RolePermissionEdge, RoleRecord};

/// Repository port for role and permission administration.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists every role.
    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>>;

    /// Lists every permission known to the backend.
    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>>;

    /// Lists every role-permission grant.
    async fn list_role_permissions(&self) -> AppResult<Vec<RolePermissionEdge>>;

    /// Creates a custom role without grants.
    async fn create_role(&self, name: &str, description: &str) -> AppResult<RoleRecord>;

    /// Renames a custom role and replaces its description.
    async fn update_role(&self, role_id: &str, name: &str, description: &str) -> AppResult<()>;

    /// Deletes a custom role.
    async fn delete_role(&self, role_id: &str) -> AppResult<()>;

    /// Grants a permission to a role.
    async fn add_permission_to_role(&self, role_id: &str, permission_name: &str)
    -> AppResult<()>;

    /// Revokes a permission from a role.
    async fn remove_permission_from_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()>;
}

/// Repository port for user profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds the profile of one user.
    async fn find_profile(&self, user_id: &str) -> AppResult<Option<ProfileRecord>>;

    /// Lists every user profile.
    async fn list_profiles(&self) -> AppResult<Vec<ProfileRecord>>;

    /// Stores a new role name on a user profile.
    async fn update_user_role(&self, user_id: &str, role_name: &str) -> AppResult<()>;
}
