use chrono::{DateTime, Utc};

use fleetops_core::Identity;

/// Startup session recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    /// Startup check not run yet or still running.
    Initializing,
    /// A valid session was restored.
    SessionFound,
    /// No session exists.
    NoSession,
    /// The session check failed.
    Error,
}

/// Non-secret view of the backend session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session expiry, when known.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reactive authentication state published to subscribers.
///
/// `is_authenticated` is derived from the presence of an identity, so the
/// state can never be authenticated without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    user: Option<Identity>,
    session: Option<SessionInfo>,
    is_loading: bool,
    error: Option<String>,
    phase: StartupPhase,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            is_loading: true,
            error: None,
            phase: StartupPhase::Initializing,
        }
    }
}

impl AuthState {
    /// Returns the authenticated identity.
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    /// Returns the current session summary.
    #[must_use]
    pub fn session(&self) -> Option<SessionInfo> {
        self.session
    }

    /// Returns whether an identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns whether an auth operation is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns the last user-visible error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the startup phase.
    #[must_use]
    pub fn phase(&self) -> StartupPhase {
        self.phase
    }

    pub(crate) fn begin_loading(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    pub(crate) fn stop_loading(&mut self) {
        self.is_loading = false;
    }

    pub(crate) fn authenticate(&mut self, identity: Identity, session: SessionInfo) {
        self.user = Some(identity);
        self.session = Some(session);
        self.is_loading = false;
        self.error = None;
    }

    pub(crate) fn update_session(&mut self, session: SessionInfo) {
        if let Some(user) = self.user.take() {
            self.user = Some(user.with_session_expiry(session.expires_at));
            self.session = Some(session);
        }
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(message.into());
    }

    pub(crate) fn sign_out(&mut self) {
        self.user = None;
        self.session = None;
        self.is_loading = false;
        self.error = None;
    }

    pub(crate) fn set_phase(&mut self, phase: StartupPhase) {
        self.phase = phase;
    }
}
