//! Ports for the hosted identity backend and client-local session storage.

use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use fleetops_core::AppResult;

/// User object returned by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    /// Stable user identifier.
    pub id: String,
    /// Sign-in email, if the provider returned one.
    pub email: Option<String>,
    /// Display name from user metadata, if set.
    pub display_name: Option<String>,
}

/// Session issued by the identity backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSession {
    /// Bearer token for backend calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// Access token expiry, when the backend reports one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Authenticated user.
    pub user: BackendUser,
}

impl Debug for BackendSession {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BackendSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Kinds of session changes pushed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// Session restored when the client starts.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The access token was renewed.
    TokenRefreshed,
    /// User attributes changed.
    UserUpdated,
    /// A password recovery link was opened.
    PasswordRecovery,
}

/// Session change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    /// Event kind.
    pub event: AuthEvent,
    /// Session after the change, if any.
    pub session: Option<BackendSession>,
}

/// Scope of a sign-out request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    /// Only the current session.
    Local,
    /// Every session of the user.
    Global,
}

impl SignOutScope {
    /// Returns the transport value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
        }
    }
}

/// Port for the hosted identity backend.
///
/// Implementations own the backend tokens, the same way a vendor SDK keeps
/// them in client storage.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> AppResult<BackendSession>;

    /// Invalidates sessions server-side and drops local tokens.
    async fn sign_out(&self, scope: SignOutScope) -> AppResult<()>;

    /// Renews the current session.
    async fn refresh_session(&self) -> AppResult<BackendSession>;

    /// Returns the current session, validating stored tokens.
    async fn current_session(&self) -> AppResult<Option<BackendSession>>;

    /// Removes locally stored tokens without contacting the backend.
    async fn clear_local_session(&self) -> AppResult<()>;

    /// Subscribes to pushed session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Identity projection persisted between client runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// User identifier.
    pub user_id: String,
    /// Sign-in email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role name.
    pub role: String,
    /// Expiry computed at sign-in.
    pub expires_at: DateTime<Utc>,
}

/// Port for client-local persisted auth state.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session, if any.
    async fn load(&self) -> AppResult<Option<StoredSession>>;

    /// Replaces the stored session.
    async fn save(&self, session: &StoredSession) -> AppResult<()>;

    /// Removes the stored session.
    async fn clear(&self) -> AppResult<()>;

    /// Returns the email remembered for sign-in prefill.
    async fn remembered_email(&self) -> AppResult<Option<String>>;

    /// Remembers an email for the next sign-in.
    async fn remember_email(&self, email: &str) -> AppResult<()>;

    /// Forgets the remembered email.
    async fn forget_email(&self) -> AppResult<()>;
}
