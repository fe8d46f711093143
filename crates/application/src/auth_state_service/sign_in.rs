use super::*;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, info};

use fleetops_core::AppError;
use fleetops_domain::EmailAddress;

impl AuthStateController {
    /// Signs in with email and password.
    ///
    /// A duplicate call for the same email while an attempt is pending joins
    /// that attempt and receives its result. A call for another email, or
    /// during a sign-out, is rejected with `AppError::Conflict`. New attempts
    /// pass through the sign-in throttle first.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> AppResult<Identity> {
        let email = EmailAddress::new(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_owned()));
        }

        let (pending, started) = {
            let mut operation = self.inner.lock_operation();
            let joined = match &*operation {
                AuthOperation::SigningIn {
                    email: pending_email,
                    pending,
                } if pending_email == email.as_str() => Some(pending.clone()),
                AuthOperation::SigningIn { .. } | AuthOperation::SigningOut => {
                    return Err(AppError::Conflict(
                        "another sign-in or sign-out is already in progress".to_owned(),
                    ));
                }
                AuthOperation::Idle => None,
            };

            if let Some(pending) = joined {
                debug!(email = %email.as_str(), "joining in-flight sign-in");
                (pending, false)
            } else {
                self.inner.throttle.try_acquire()?;

                let guard = OperationGuard {
                    inner: Arc::clone(&self.inner),
                };
                let inner = Arc::clone(&self.inner);
                let email_value = email.as_str().to_owned();
                let password = password.to_owned();
                let pending = async move {
                    let _guard = guard;
                    inner
                        .perform_sign_in(email_value.as_str(), password.as_str(), remember_me)
                        .await
                }
                .boxed()
                .shared();

                *operation = AuthOperation::SigningIn {
                    email: email.as_str().to_owned(),
                    pending: pending.clone(),
                };
                (pending, true)
            }
        };

        if started {
            // Drive the attempt to completion even if every caller goes away.
            tokio::spawn(pending.clone());
        }

        pending.await
    }
}

impl ControllerInner {
    async fn perform_sign_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> AppResult<Identity> {
        self.state.send_modify(AuthState::begin_loading);

        let session = match self.backend.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(error) => {
                warn!(email = %email, error = %error, "sign-in rejected");
                self.state
                    .send_modify(|state| state.fail(error.message().to_owned()));
                self.notify(Notice::error(format!("Sign-in failed: {}", error.message())));
                return Err(error);
            }
        };

        let expires_at = self.policy.session_expiry(Utc::now(), remember_me);
        let identity = self
            .mapper
            .map_identity(&session.user)
            .await
            .with_session_expiry(Some(expires_at));

        self.persist_session(&identity, expires_at).await;

        let remembered = if remember_me {
            self.session_store.remember_email(email).await
        } else {
            self.session_store.forget_email().await
        };
        if let Err(error) = remembered {
            warn!(error = %error, "failed to update remembered email");
        }

        self.throttle.reset();
        self.publish_authenticated(
            identity.clone(),
            SessionInfo {
                expires_at: Some(expires_at),
            },
        );

        info!(
            user_id = %identity.id(),
            role = %identity.role(),
            remember_me,
            "signed in"
        );
        self.notify(Notice::success(format!(
            "Welcome back, {}",
            identity.display_name()
        )));

        Ok(identity)
    }
}
