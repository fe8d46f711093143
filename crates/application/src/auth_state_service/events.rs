use super::*;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{AuthEvent, AuthStateChange, BackendSession};

impl AuthStateController {
    /// Listens for backend-pushed session changes until the backend closes
    /// the channel.
    pub fn spawn_event_listener(&self) -> JoinHandle<()> {
        let mut changes = self.inner.backend.subscribe();
        let controller = self.clone();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        controller.handle_auth_change(change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth event listener lagged behind");
                    }
                    Err(RecvError::Closed) => {
                        debug!("auth event channel closed");
                        break;
                    }
                }
            }
        })
    }

    /// Applies one backend session change to local state.
    ///
    /// Identity re-resolution runs in a spawned task so the caller is never
    /// blocked on a profile lookup; its handle is returned when one starts.
    /// A task overtaken by a sign-out publishes nothing.
    pub fn handle_auth_change(&self, change: AuthStateChange) -> Option<JoinHandle<()>> {
        debug!(event = ?change.event, has_session = change.session.is_some(), "auth state change");

        match (change.event, change.session) {
            (AuthEvent::SignedOut, _) => {
                self.inner.reset_local_state();
                None
            }
            (
                event @ (AuthEvent::SignedIn | AuthEvent::TokenRefreshed | AuthEvent::UserUpdated),
                Some(session),
            ) => {
                let inner = Arc::clone(&self.inner);
                let epoch = inner.sign_out_epoch();
                Some(tokio::spawn(async move {
                    inner.resolve_pushed_session(event, session, epoch).await;
                }))
            }
            (AuthEvent::TokenRefreshed, None) => None,
            (_, None) => {
                self.inner.reset_local_state();
                None
            }
            (_, Some(_)) => None,
        }
    }
}

impl ControllerInner {
    async fn resolve_pushed_session(
        &self,
        event: AuthEvent,
        session: BackendSession,
        epoch: u64,
    ) {
        if self.sign_out_epoch() != epoch {
            debug!(event = ?event, "dropping backend event overtaken by sign-out");
            return;
        }

        if event == AuthEvent::UserUpdated {
            self.mapper.cache().invalidate(session.user.id.as_str()).await;
        }

        let current_expiry = self
            .current_state()
            .user()
            .filter(|user| user.id() == session.user.id)
            .and_then(Identity::session_expires_at);
        let stored_expiry = match self.session_store.load().await {
            Ok(stored) => stored
                .filter(|stored| stored.user_id == session.user.id)
                .map(|stored| stored.expires_at),
            Err(error) => {
                warn!(error = %error, "failed to read stored session");
                None
            }
        };
        let expires_at = current_expiry.or(stored_expiry).or(session.expires_at);

        let identity = self
            .mapper
            .map_identity(&session.user)
            .await
            .with_session_expiry(expires_at);

        if self.sign_out_epoch() != epoch {
            self.mapper.cache().invalidate(identity.id()).await;
            debug!(
                user_id = %identity.id(),
                event = ?event,
                "dropping identity resolved across sign-out"
            );
            return;
        }

        info!(user_id = %identity.id(), event = ?event, "session updated from backend event");
        self.publish_authenticated(identity, SessionInfo { expires_at });
    }
}
