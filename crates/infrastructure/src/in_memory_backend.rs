//! In-memory identity and data backend.
//!
//! Implements every backend port against process-local state. Roles start
//! with the built-in `Admin` (every catalog permission) and `Customer` (none).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use fleetops_application::{
    AuthBackend, AuthEvent, AuthStateChange, BackendSession, BackendUser, PermissionRecord,
    ProfileRecord, ProfileRepository, RolePermissionEdge, RoleRecord, RoleRepository,
    SignOutScope,
};
use fleetops_core::{AppError, AppResult};
use fleetops_domain::{DEFAULT_ROLE_NAME, PermissionCatalog, role_names_match};

const ADMIN_ROLE_NAME: &str = "Admin";

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

/// In-memory backend implementing auth, role and profile ports.
#[derive(Debug)]
pub struct InMemoryBackend {
    accounts: RwLock<HashMap<String, Account>>,
    profiles: RwLock<Vec<ProfileRecord>>,
    roles: RwLock<Vec<RoleRecord>>,
    permissions: Vec<PermissionRecord>,
    edges: RwLock<Vec<RolePermissionEdge>>,
    session: RwLock<Option<BackendSession>>,
    session_ttl: chrono::Duration,
    events: broadcast::Sender<AuthStateChange>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates a backend seeded with the permission catalog and built-in roles.
    #[must_use]
    pub fn new() -> Self {
        let permissions = PermissionCatalog::all_keys()
            .map(|key| PermissionRecord {
                permission_id: Uuid::new_v4().to_string(),
                name: key.to_owned(),
                description: PermissionCatalog::describe(key).map(str::to_owned),
            })
            .collect();

        let admin = RoleRecord {
            role_id: Uuid::new_v4().to_string(),
            name: ADMIN_ROLE_NAME.to_owned(),
            description: Some("Full access to every area".to_owned()),
            is_built_in: true,
        };
        let customer = RoleRecord {
            role_id: Uuid::new_v4().to_string(),
            name: DEFAULT_ROLE_NAME.to_owned(),
            description: Some("Customer portal access".to_owned()),
            is_built_in: true,
        };
        let edges = PermissionCatalog::all_keys()
            .map(|key| RolePermissionEdge {
                role_id: admin.role_id.clone(),
                permission_name: key.to_owned(),
            })
            .collect();

        let (events, _) = broadcast::channel(32);
        Self {
            accounts: RwLock::new(HashMap::new()),
            profiles: RwLock::new(Vec::new()),
            roles: RwLock::new(vec![admin, customer]),
            permissions,
            edges: RwLock::new(edges),
            session: RwLock::new(None),
            session_ttl: chrono::Duration::hours(1),
            events,
        }
    }

    /// Registers an account with its profile.
    #[must_use]
    pub fn with_account(mut self, email: &str, password: &str, name: &str, role: &str) -> Self {
        let user_id = Uuid::new_v4().to_string();
        self.accounts.get_mut().insert(
            email.trim().to_lowercase(),
            Account {
                user_id: user_id.clone(),
                password: password.to_owned(),
            },
        );
        self.profiles.get_mut().push(ProfileRecord {
            user_id,
            name: Some(name.to_owned()),
            email: Some(email.trim().to_lowercase()),
            role: Some(role.to_owned()),
        });
        self
    }

    /// Overrides the lifetime of issued sessions.
    #[must_use]
    pub fn with_session_ttl(mut self, session_ttl: chrono::Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// Returns the id of a role by name.
    pub async fn role_id(&self, name: &str) -> Option<String> {
        self.roles
            .read()
            .await
            .iter()
            .find(|role| role_names_match(role.name.as_str(), name))
            .map(|role| role.role_id.clone())
    }

    /// Returns the id of an account by email.
    pub async fn user_id(&self, email: &str) -> Option<String> {
        self.accounts
            .read()
            .await
            .get(email.trim().to_lowercase().as_str())
            .map(|account| account.user_id.clone())
    }

    async fn issue_session(&self, user_id: &str, email: &str) -> BackendSession {
        let display_name = self
            .profiles
            .read()
            .await
            .iter()
            .find(|profile| profile.user_id == user_id)
            .and_then(|profile| profile.name.clone());

        BackendSession {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Some(Utc::now() + self.session_ttl),
            user: BackendUser {
                id: user_id.to_owned(),
                email: Some(email.to_owned()),
                display_name,
            },
        }
    }

    fn emit(&self, event: AuthEvent, session: Option<BackendSession>) {
        // No receivers is not an error.
        let _ = self.events.send(AuthStateChange { event, session });
    }

    async fn ensure_role_exists(&self, role_id: &str) -> AppResult<RoleRecord> {
        self.roles
            .read()
            .await
            .iter()
            .find(|role| role.role_id == role_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AppResult<BackendSession> {
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .read()
            .await
            .get(email.as_str())
            .filter(|account| account.password == password)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid login credentials".to_owned()))?;

        let session = self
            .issue_session(account.user_id.as_str(), email.as_str())
            .await;
        *self.session.write().await = Some(session.clone());
        debug!(user_id = %account.user_id, "in-memory session issued");
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, _scope: SignOutScope) -> AppResult<()> {
        if self.session.write().await.take().is_some() {
            self.emit(AuthEvent::SignedOut, None);
        }
        Ok(())
    }

    async fn refresh_session(&self) -> AppResult<BackendSession> {
        let current = self.session.read().await.clone().ok_or_else(|| {
            AppError::Unauthorized("Invalid Refresh Token: Refresh Token Not Found".to_owned())
        })?;

        let email = current.user.email.clone().unwrap_or_default();
        let session = self
            .issue_session(current.user.id.as_str(), email.as_str())
            .await;
        *self.session.write().await = Some(session.clone());
        self.emit(AuthEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    async fn current_session(&self) -> AppResult<Option<BackendSession>> {
        let session = self.session.read().await.clone();
        Ok(session.filter(|session| {
            session
                .expires_at
                .is_none_or(|expires_at| expires_at > Utc::now())
        }))
    }

    async fn clear_local_session(&self) -> AppResult<()> {
        *self.session.write().await = None;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RoleRepository for InMemoryBackend {
    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        Ok(self.roles.read().await.clone())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        Ok(self.permissions.clone())
    }

    async fn list_role_permissions(&self) -> AppResult<Vec<RolePermissionEdge>> {
        Ok(self.edges.read().await.clone())
    }

    async fn create_role(&self, name: &str, description: &str) -> AppResult<RoleRecord> {
        let mut roles = self.roles.write().await;
        if roles
            .iter()
            .any(|role| role_names_match(role.name.as_str(), name))
        {
            return Err(AppError::Conflict(format!(
                "a role named '{name}' already exists"
            )));
        }

        let record = RoleRecord {
            role_id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            description: Some(description.to_owned()),
            is_built_in: false,
        };
        roles.push(record.clone());
        Ok(record)
    }

    async fn update_role(&self, role_id: &str, name: &str, description: &str) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        if roles
            .iter()
            .any(|role| role.role_id != role_id && role_names_match(role.name.as_str(), name))
        {
            return Err(AppError::Conflict(format!(
                "a role named '{name}' already exists"
            )));
        }

        let role = roles
            .iter_mut()
            .find(|role| role.role_id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        if role.is_built_in {
            return Err(AppError::Forbidden(format!(
                "role '{}' is built-in",
                role.name
            )));
        }

        role.name = name.to_owned();
        role.description = Some(description.to_owned());
        Ok(())
    }

    async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        let role = self.ensure_role_exists(role_id).await?;
        if role.is_built_in {
            return Err(AppError::Forbidden(format!(
                "role '{}' is built-in",
                role.name
            )));
        }

        self.roles
            .write()
            .await
            .retain(|candidate| candidate.role_id != role_id);
        self.edges
            .write()
            .await
            .retain(|edge| edge.role_id != role_id);
        Ok(())
    }

    async fn add_permission_to_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.ensure_role_exists(role_id).await?;
        if !self
            .permissions
            .iter()
            .any(|permission| permission.name == permission_name)
        {
            return Err(AppError::NotFound(format!(
                "permission '{permission_name}' was not found"
            )));
        }

        let mut edges = self.edges.write().await;
        if !edges
            .iter()
            .any(|edge| edge.role_id == role_id && edge.permission_name == permission_name)
        {
            edges.push(RolePermissionEdge {
                role_id: role_id.to_owned(),
                permission_name: permission_name.to_owned(),
            });
        }
        Ok(())
    }

    async fn remove_permission_from_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.ensure_role_exists(role_id).await?;
        self.edges
            .write()
            .await
            .retain(|edge| !(edge.role_id == role_id && edge.permission_name == permission_name));
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn find_profile(&self, user_id: &str) -> AppResult<Option<ProfileRecord>> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|profile| profile.user_id == user_id)
            .cloned())
    }

    async fn list_profiles(&self) -> AppResult<Vec<ProfileRecord>> {
        Ok(self.profiles.read().await.clone())
    }

    async fn update_user_role(&self, user_id: &str, role_name: &str) -> AppResult<()> {
        let role_exists = self
            .roles
            .read()
            .await
            .iter()
            .any(|role| role_names_match(role.name.as_str(), role_name));
        if !role_exists {
            return Err(AppError::NotFound(format!(
                "role '{role_name}' was not found"
            )));
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .iter_mut()
            .find(|profile| profile.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;
        profile.role = Some(role_name.to_owned());

        let updated = profile.clone();
        drop(profiles);

        let session = self.session.read().await.clone();
        if let Some(session) = session.filter(|session| session.user.id == updated.user_id) {
            self.emit(AuthEvent::UserUpdated, Some(session));
        }
        Ok(())
    }
}
