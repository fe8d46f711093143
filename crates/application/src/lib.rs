//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_ports;
mod auth_state_service;
mod identity_mapper;
mod notification;
mod rate_limit_service;
mod role_service;
mod security_admin_ports;
mod user_role_service;

#[cfg(test)]
mod test_support;

pub use auth_ports::{
    AuthBackend, AuthEvent, AuthStateChange, BackendSession, BackendUser, SessionStore,
    SignOutScope, StoredSession,
};
pub use auth_state_service::{
    AuthState, AuthStateController, SessionInfo, SessionPolicy, StartupOutcome, StartupPhase,
};
pub use identity_mapper::{IdentityCache, IdentityMapper};
pub use notification::{Notice, NoticeLevel, Notifier};
pub use rate_limit_service::{SignInPolicy, SignInThrottle};
pub use role_service::{CatalogDrift, CategorySummary, RoleManager};
pub use security_admin_ports::{
    PermissionRecord, ProfileRecord, ProfileRepository, RolePermissionEdge, RoleRecord,
    RoleRepository,
};
pub use user_role_service::{UserData, UserRoleService};
