use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{Mutex, broadcast};

use fleetops_core::{AppError, AppResult};

use crate::{
    AuthBackend, AuthStateChange, BackendSession, BackendUser, Notice, Notifier, PermissionRecord,
    ProfileRecord, ProfileRepository, RolePermissionEdge, RoleRecord, RoleRepository,
    SessionStore, SignOutScope, StoredSession,
};

pub(crate) fn backend_session(user_id: &str, email: &str) -> BackendSession {
    BackendSession {
        access_token: format!("access-{user_id}"),
        refresh_token: format!("refresh-{user_id}"),
        expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
        user: BackendUser {
            id: user_id.to_owned(),
            email: Some(email.to_owned()),
            display_name: None,
        },
    }
}

pub(crate) struct FakeAuthBackend {
    pub sign_in_result: Mutex<AppResult<BackendSession>>,
    pub sign_in_delay: Option<Duration>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_result: Mutex<AppResult<()>>,
    pub sign_out_calls: AtomicUsize,
    pub refresh_result: Mutex<AppResult<BackendSession>>,
    pub current_session_result: Mutex<AppResult<Option<BackendSession>>>,
    pub current_session_hangs: bool,
    pub clear_local_calls: AtomicUsize,
    pub events: broadcast::Sender<AuthStateChange>,
}

impl FakeAuthBackend {
    pub(crate) fn new(session: BackendSession) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            sign_in_result: Mutex::new(Ok(session.clone())),
            sign_in_delay: None,
            sign_in_calls: AtomicUsize::new(0),
            sign_out_result: Mutex::new(Ok(())),
            sign_out_calls: AtomicUsize::new(0),
            refresh_result: Mutex::new(Ok(session)),
            current_session_result: Mutex::new(Ok(None)),
            current_session_hangs: false,
            clear_local_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub(crate) fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> AppResult<BackendSession> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.sign_in_delay {
            tokio::time::sleep(delay).await;
        }
        self.sign_in_result.lock().await.clone()
    }

    async fn sign_out(&self, scope: SignOutScope) -> AppResult<()> {
        assert_eq!(scope, SignOutScope::Global);
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_out_result.lock().await.clone()
    }

    async fn refresh_session(&self) -> AppResult<BackendSession> {
        self.refresh_result.lock().await.clone()
    }

    async fn current_session(&self) -> AppResult<Option<BackendSession>> {
        if self.current_session_hangs {
            std::future::pending::<()>().await;
        }
        self.current_session_result.lock().await.clone()
    }

    async fn clear_local_session(&self) -> AppResult<()> {
        self.clear_local_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct MemorySessionStore {
    pub session: Mutex<Option<StoredSession>>,
    pub email: Mutex<Option<String>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> AppResult<()> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.session.lock().await = None;
        Ok(())
    }

    async fn remembered_email(&self) -> AppResult<Option<String>> {
        Ok(self.email.lock().await.clone())
    }

    async fn remember_email(&self, email: &str) -> AppResult<()> {
        *self.email.lock().await = Some(email.to_owned());
        Ok(())
    }

    async fn forget_email(&self) -> AppResult<()> {
        *self.email.lock().await = None;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub notices: StdMutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[derive(Default)]
pub(crate) struct FakeProfileRepository {
    pub profiles: Mutex<Vec<ProfileRecord>>,
    pub fail_updates: bool,
}

impl FakeProfileRepository {
    pub(crate) fn with_profiles(profiles: Vec<ProfileRecord>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
            fail_updates: false,
        }
    }
}

pub(crate) fn profile(user_id: &str, name: &str, role: &str) -> ProfileRecord {
    ProfileRecord {
        user_id: user_id.to_owned(),
        name: Some(name.to_owned()),
        email: Some(format!("{user_id}@example.com")),
        role: Some(role.to_owned()),
    }
}

#[async_trait]
impl ProfileRepository for FakeProfileRepository {
    async fn find_profile(&self, user_id: &str) -> AppResult<Option<ProfileRecord>> {
        Ok(self
            .profiles
            .lock()
            .await
            .iter()
            .find(|profile| profile.user_id == user_id)
            .cloned())
    }

    async fn list_profiles(&self) -> AppResult<Vec<ProfileRecord>> {
        Ok(self.profiles.lock().await.clone())
    }

    async fn update_user_role(&self, user_id: &str, role_name: &str) -> AppResult<()> {
        if self.fail_updates {
            return Err(AppError::Internal("profile update rejected".to_owned()));
        }

        let mut profiles = self.profiles.lock().await;
        let profile = profiles
            .iter_mut()
            .find(|profile| profile.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;
        profile.role = Some(role_name.to_owned());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRoleRepository {
    pub roles: Mutex<Vec<RoleRecord>>,
    pub edges: Mutex<Vec<RolePermissionEdge>>,
    pub permissions: Vec<PermissionRecord>,
    pub failing_permissions: Mutex<HashSet<String>>,
    pub backend_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeRoleRepository {
    pub(crate) fn with_roles(roles: Vec<RoleRecord>, edges: Vec<RolePermissionEdge>) -> Self {
        Self {
            roles: Mutex::new(roles),
            edges: Mutex::new(edges),
            ..Self::default()
        }
    }

    pub(crate) fn backend_calls(&self) -> usize {
        self.backend_calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn fail_permission(&self, permission_name: &str) {
        self.failing_permissions
            .lock()
            .await
            .insert(permission_name.to_owned());
    }

    async fn check_permission_failure(&self, permission_name: &str) -> AppResult<()> {
        if self
            .failing_permissions
            .lock()
            .await
            .contains(permission_name)
        {
            return Err(AppError::Internal(format!(
                "grant '{permission_name}' rejected"
            )));
        }
        Ok(())
    }
}

pub(crate) fn role_record(role_id: &str, name: &str, is_built_in: bool) -> RoleRecord {
    RoleRecord {
        role_id: role_id.to_owned(),
        name: name.to_owned(),
        description: Some(format!("{name} role")),
        is_built_in,
    }
}

pub(crate) fn edge(role_id: &str, permission_name: &str) -> RolePermissionEdge {
    RolePermissionEdge {
        role_id: role_id.to_owned(),
        permission_name: permission_name.to_owned(),
    }
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        Ok(self.permissions.clone())
    }

    async fn list_role_permissions(&self) -> AppResult<Vec<RolePermissionEdge>> {
        Ok(self.edges.lock().await.clone())
    }

    async fn create_role(&self, name: &str, description: &str) -> AppResult<RoleRecord> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = RoleRecord {
            role_id: format!("created-{id}"),
            name: name.to_owned(),
            description: Some(description.to_owned()),
            is_built_in: false,
        };
        self.roles.lock().await.push(record.clone());
        Ok(record)
    }

    async fn update_role(&self, role_id: &str, name: &str, description: &str) -> AppResult<()> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        let mut roles = self.roles.lock().await;
        let role = roles
            .iter_mut()
            .find(|role| role.role_id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.name = name.to_owned();
        role.description = Some(description.to_owned());
        Ok(())
    }

    async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        self.roles
            .lock()
            .await
            .retain(|role| role.role_id != role_id);
        self.edges
            .lock()
            .await
            .retain(|edge| edge.role_id != role_id);
        Ok(())
    }

    async fn add_permission_to_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        self.check_permission_failure(permission_name).await?;
        let mut edges = self.edges.lock().await;
        if !edges
            .iter()
            .any(|edge| edge.role_id == role_id && edge.permission_name == permission_name)
        {
            edges.push(edge(role_id, permission_name));
        }
        Ok(())
    }

    async fn remove_permission_from_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        self.check_permission_failure(permission_name).await?;
        self.edges
            .lock()
            .await
            .retain(|edge| !(edge.role_id == role_id && edge.permission_name == permission_name));
        Ok(())
    }
}
