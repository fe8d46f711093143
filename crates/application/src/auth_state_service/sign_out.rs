use super::*;

use tracing::{debug, info};

use crate::SignOutScope;

impl AuthStateController {
    /// Signs out of every session of the current user.
    ///
    /// Does nothing while another sign-in or sign-out holds the operation
    /// slot. Local state is always cleared; a failed server-side
    /// invalidation only produces a warning notice.
    pub async fn sign_out(&self) -> AppResult<()> {
        let guard = {
            let mut operation = self.inner.lock_operation();
            if !matches!(*operation, AuthOperation::Idle) {
                debug!("sign-out skipped, another auth operation is in flight");
                return Ok(());
            }
            *operation = AuthOperation::SigningOut;
            OperationGuard {
                inner: Arc::clone(&self.inner),
            }
        };

        self.inner.perform_sign_out().await;
        drop(guard);
        Ok(())
    }
}

impl ControllerInner {
    async fn perform_sign_out(&self) {
        let user_id = self.current_state().user().map(|user| user.id().to_owned());
        self.advance_sign_out_epoch();
        self.state.send_modify(AuthState::begin_loading);

        self.mapper.clear().await;
        self.clear_stored_session().await;

        let server_result = self.backend.sign_out(SignOutScope::Global).await;
        self.reset_local_state();

        match server_result {
            Ok(()) => {
                info!(user_id = ?user_id, "signed out");
            }
            Err(error) => {
                warn!(
                    user_id = ?user_id,
                    error = %error,
                    "server-side session invalidation failed, local session cleared"
                );
                self.notify(Notice::warning(
                    "Signed out on this device, but other sessions may still be active",
                ));
            }
        }
    }
}
