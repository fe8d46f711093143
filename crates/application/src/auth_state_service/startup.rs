use super::*;

use std::sync::atomic::Ordering;

use tracing::{debug, info};

use crate::BackendSession;

/// Result of the startup session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// A valid session was restored.
    SessionFound(Identity),
    /// No session exists.
    NoSession,
    /// The session check failed.
    Error {
        /// Backend error message.
        message: String,
        /// Local auth artifacts were purged.
        recovered: bool,
        /// The host should reload once to start from a clean slate.
        reload_required: bool,
    },
}

/// Returns whether an error message points at unusable stored tokens.
#[must_use]
pub(crate) fn looks_like_token_corruption(message: &str) -> bool {
    let message = message.to_lowercase();
    ["invalid", "token", "expired"]
        .iter()
        .any(|marker| message.contains(marker))
}

impl AuthStateController {
    /// Restores the session on startup.
    ///
    /// A failsafe timer clears the loading flag after the configured startup
    /// timeout even if the backend never answers; it does not cancel the
    /// check itself.
    pub async fn initialize(&self) -> StartupOutcome {
        self.inner.state.send_modify(|state| {
            state.set_phase(StartupPhase::Initializing);
            state.begin_loading();
        });

        let failsafe = {
            let inner = Arc::clone(&self.inner);
            let timeout = self.inner.policy.startup_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if inner.current_state().is_loading() {
                    warn!(
                        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "startup session check still pending, clearing loading state"
                    );
                    inner.state.send_modify(AuthState::stop_loading);
                }
            })
        };

        let outcome = match self.inner.backend.current_session().await {
            Ok(Some(session)) => self.inner.restore_session(session).await,
            Ok(None) => {
                debug!("no session found on startup");
                self.inner.clear_stored_session().await;
                self.inner.state.send_modify(|state| {
                    state.sign_out();
                    state.set_phase(StartupPhase::NoSession);
                });
                StartupOutcome::NoSession
            }
            Err(error) => self.inner.recover_from_startup_error(error.to_string()).await,
        };

        failsafe.abort();
        outcome
    }
}

impl ControllerInner {
    async fn restore_session(&self, session: BackendSession) -> StartupOutcome {
        let stored_expiry = match self.session_store.load().await {
            Ok(stored) => stored
                .filter(|stored| stored.user_id == session.user.id)
                .map(|stored| stored.expires_at),
            Err(error) => {
                warn!(error = %error, "failed to read stored session");
                None
            }
        };

        let expires_at = stored_expiry.or(session.expires_at);
        let identity = self
            .mapper
            .map_identity(&session.user)
            .await
            .with_session_expiry(expires_at);

        if let Some(expires_at) = expires_at {
            self.persist_session(&identity, expires_at).await;
        }

        self.state.send_modify(|state| {
            state.authenticate(identity.clone(), SessionInfo { expires_at });
            state.set_phase(StartupPhase::SessionFound);
        });
        info!(user_id = %identity.id(), "session restored on startup");

        StartupOutcome::SessionFound(identity)
    }

    async fn recover_from_startup_error(&self, message: String) -> StartupOutcome {
        warn!(error = %message, "startup session check failed");
        self.state.send_modify(|state| {
            state.fail(message.clone());
            state.set_phase(StartupPhase::Error);
        });

        if !looks_like_token_corruption(message.as_str())
            || self.recovery_attempted.swap(true, Ordering::SeqCst)
        {
            return StartupOutcome::Error {
                message,
                recovered: false,
                reload_required: false,
            };
        }

        info!("purging locally stored auth artifacts after token error");
        self.clear_stored_session().await;
        if let Err(error) = self.backend.clear_local_session().await {
            warn!(error = %error, "failed to clear local backend tokens");
        }
        self.mapper.clear().await;

        let reload_required = !self.current_state().is_authenticated();
        StartupOutcome::Error {
            message,
            recovered: true,
            reload_required,
        }
    }
}
