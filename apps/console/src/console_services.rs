use std::sync::Arc;

use fleetops_application::{
    AuthStateController, IdentityCache, IdentityMapper, Notifier, RoleManager, UserRoleService,
};
use fleetops_core::AppError;
use fleetops_infrastructure::{FileSessionStore, HttpBackendClient, TracingNotifier};

use crate::console_config::ConsoleConfig;

/// Application services wired against the hosted backend.
#[derive(Clone)]
pub struct ConsoleServices {
    pub auth: AuthStateController,
    pub roles: RoleManager,
    pub users: UserRoleService,
}

pub fn build_console_services(config: &ConsoleConfig) -> Result<ConsoleServices, AppError> {
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let backend = Arc::new(HttpBackendClient::new(
        http_client,
        config.backend_url.clone(),
        config.api_key.clone(),
        config.token_path(),
    ));
    let session_store = Arc::new(FileSessionStore::new(config.state_dir.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new());
    let identity_cache = IdentityCache::new();

    let auth = AuthStateController::new(
        backend.clone(),
        session_store,
        IdentityMapper::new(backend.clone(), identity_cache.clone()),
        notifier.clone(),
    );
    let roles = RoleManager::new(backend.clone(), backend.clone(), notifier.clone());
    let users = UserRoleService::new(backend, roles.clone(), identity_cache, notifier);

    Ok(ConsoleServices { auth, roles, users })
}
