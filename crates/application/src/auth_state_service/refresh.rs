use super::*;

use tracing::debug;

impl AuthStateController {
    /// Renews the backend session. Best-effort: failures return `false`.
    pub async fn refresh_token(&self) -> bool {
        let session = match self.inner.backend.refresh_session().await {
            Ok(session) => session,
            Err(error) => {
                debug!(error = %error, "token refresh failed");
                return false;
            }
        };

        let now = Utc::now();
        let renewed = session
            .expires_at
            .unwrap_or(now + self.inner.policy.default_ttl);

        let stored = match self.inner.session_store.load().await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "failed to read stored session during refresh");
                None
            }
        };

        let expires_at = match stored {
            Some(mut stored) if stored.user_id == session.user.id => {
                stored.expires_at = stored.expires_at.max(renewed);
                if let Err(error) = self.inner.session_store.save(&stored).await {
                    warn!(error = %error, "failed to persist refreshed session expiry");
                }
                stored.expires_at
            }
            _ => renewed,
        };

        self.inner.state.send_modify(|state| {
            state.update_session(SessionInfo {
                expires_at: Some(expires_at),
            });
        });
        debug!(user_id = %session.user.id, %expires_at, "token refreshed");
        true
    }
}
