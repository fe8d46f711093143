//! Authentication state controller.
//!
//! Owns the reactive auth state, drives sign-in, sign-out and token refresh
//! against the identity backend, recovers the session on startup, and
//! reconciles backend-pushed session changes.

mod events;
mod refresh;
mod sign_in;
mod sign_out;
mod startup;
mod state;


use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tracing::warn;

use fleetops_core::{AppResult, Identity};

use crate::{
    AuthBackend, IdentityMapper, Notice, Notifier, SessionStore, SignInPolicy, SignInThrottle,
    StoredSession,
};

pub use startup::StartupOutcome;
pub use state::{AuthState, SessionInfo, StartupPhase};

/// Session lifetime rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Stored session lifetime when the user asked to be remembered.
    pub remember_me_ttl: chrono::Duration,
    /// Stored session lifetime otherwise.
    pub default_ttl: chrono::Duration,
    /// Failsafe after which startup stops reporting a loading state.
    pub startup_timeout: Duration,
}

impl SessionPolicy {
    /// Computes the stored session expiry for a new sign-in.
    #[must_use]
    pub fn session_expiry(&self, now: DateTime<Utc>, remember_me: bool) -> DateTime<Utc> {
        if remember_me {
            now + self.remember_me_ttl
        } else {
            now + self.default_ttl
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            remember_me_ttl: chrono::Duration::days(30),
            default_ttl: chrono::Duration::hours(24),
            startup_timeout: Duration::from_secs(5),
        }
    }
}

type PendingSignIn = Shared<BoxFuture<'static, AppResult<Identity>>>;

/// Auth operation currently holding the single operation slot.
enum AuthOperation {
    Idle,
    SigningIn {
        email: String,
        pending: PendingSignIn,
    },
    SigningOut,
}

/// Releases the operation slot when the owning operation finishes or is dropped.
struct OperationGuard {
    inner: Arc<ControllerInner>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        *self.inner.lock_operation() = AuthOperation::Idle;
    }
}

struct ControllerInner {
    backend: Arc<dyn AuthBackend>,
    session_store: Arc<dyn SessionStore>,
    mapper: IdentityMapper,
    notifier: Arc<dyn Notifier>,
    throttle: SignInThrottle,
    policy: SessionPolicy,
    state: watch::Sender<AuthState>,
    operation: Mutex<AuthOperation>,
    recovery_attempted: AtomicBool,
    /// Bumped whenever local auth state is torn down.
    sign_out_epoch: AtomicU64,
}

impl ControllerInner {
    fn lock_operation(&self) -> MutexGuard<'_, AuthOperation> {
        self.operation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn publish_authenticated(&self, identity: Identity, session: SessionInfo) {
        self.state
            .send_modify(|state| state.authenticate(identity, session));
    }

    fn sign_out_epoch(&self) -> u64 {
        self.sign_out_epoch.load(Ordering::SeqCst)
    }

    fn advance_sign_out_epoch(&self) {
        self.sign_out_epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_local_state(&self) {
        self.advance_sign_out_epoch();
        self.state.send_modify(AuthState::sign_out);
    }

    async fn persist_session(&self, identity: &Identity, expires_at: DateTime<Utc>) {
        let stored = StoredSession {
            user_id: identity.id().to_owned(),
            email: identity.email().to_owned(),
            name: identity.display_name().to_owned(),
            role: identity.role().to_owned(),
            expires_at,
        };

        if let Err(error) = self.session_store.save(&stored).await {
            warn!(
                user_id = %identity.id(),
                error = %error,
                "failed to persist session to local storage"
            );
        }
    }

    async fn clear_stored_session(&self) {
        if let Err(error) = self.session_store.clear().await {
            warn!(error = %error, "failed to clear stored session");
        }
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }
}

/// Controller for the authentication session lifecycle.
#[derive(Clone)]
pub struct AuthStateController {
    inner: Arc<ControllerInner>,
}

impl AuthStateController {
    /// Creates a controller with default timing policies.
    #[must_use]
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        session_store: Arc<dyn SessionStore>,
        mapper: IdentityMapper,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_policies(
            backend,
            session_store,
            mapper,
            notifier,
            SignInPolicy::default(),
            SessionPolicy::default(),
        )
    }

    /// Creates a controller with explicit timing policies.
    #[must_use]
    pub fn with_policies(
        backend: Arc<dyn AuthBackend>,
        session_store: Arc<dyn SessionStore>,
        mapper: IdentityMapper,
        notifier: Arc<dyn Notifier>,
        sign_in_policy: SignInPolicy,
        session_policy: SessionPolicy,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(ControllerInner {
                backend,
                session_store,
                mapper,
                notifier,
                throttle: SignInThrottle::new(sign_in_policy),
                policy: session_policy,
                state,
                operation: Mutex::new(AuthOperation::Idle),
                recovery_attempted: AtomicBool::new(false),
                sign_out_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a snapshot of the current auth state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.current_state()
    }

    /// Subscribes to auth state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Returns the authenticated identity, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().user().cloned()
    }

    /// Returns the email remembered for sign-in prefill.
    pub async fn remembered_email(&self) -> AppResult<Option<String>> {
        self.inner.session_store.remembered_email().await
    }

    /// Returns whether a sign-in or sign-out is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !matches!(*self.inner.lock_operation(), AuthOperation::Idle)
    }
}
