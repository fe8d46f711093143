use super::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use fleetops_application::{AuthBackend, BackendUser, SignOutScope};

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
    #[serde(default)]
    pub(super) expires_in: Option<i64>,
    #[serde(default)]
    pub(super) expires_at: Option<i64>,
    pub(super) user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    pub(super) id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UserMetadata {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) full_name: Option<String>,
}

impl From<UserResponse> for BackendUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user
                .user_metadata
                .full_name
                .or(user.user_metadata.name)
                .filter(|name| !name.trim().is_empty()),
        }
    }
}

impl TokenResponse {
    pub(super) fn into_session(self, now: DateTime<Utc>) -> BackendSession {
        let expires_at = self
            .expires_at
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .or_else(|| {
                self.expires_in
                    .map(|seconds| now + chrono::Duration::seconds(seconds))
            });

        BackendSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

impl HttpBackendClient {
    async fn request_token(&self, grant_type: &str, body: &Value) -> AppResult<BackendSession> {
        let url = self.endpoint("auth/v1/token", &[("grant_type", grant_type)])?;
        let response = self
            .http_client
            .post(url)
            .header("apikey", self.api_key.as_str())
            .json(body)
            .send()
            .await
            .map_err(|error| transport_error(&error))?;
        let response = check_response(response, EndpointKind::Auth).await?;

        let token: TokenResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode token response: {error}"))
        })?;
        Ok(token.into_session(Utc::now()))
    }

    async fn fetch_user(&self, access_token: &str) -> AppResult<BackendUser> {
        let url = self.endpoint("auth/v1/user", &[])?;
        let response = self
            .http_client
            .get(url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| transport_error(&error))?;
        let response = check_response(response, EndpointKind::Auth).await?;

        let user: UserResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode user response: {error}"))
        })?;
        Ok(user.into())
    }
}

pub(super) fn is_near_expiry(session: &BackendSession, now: DateTime<Utc>) -> bool {
    session.expires_at.is_some_and(|expires_at| {
        expires_at <= now + chrono::Duration::seconds(EXPIRY_LEEWAY_SECONDS)
    })
}

#[async_trait]
impl AuthBackend for HttpBackendClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AppResult<BackendSession> {
        let session = self
            .request_token(
                "password",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        self.store_session(&session).await?;
        debug!(user_id = %session.user.id, "backend session issued");
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, scope: SignOutScope) -> AppResult<()> {
        let Some(session) = self.stored_session().await? else {
            return Ok(());
        };

        let url = self.endpoint("auth/v1/logout", &[("scope", scope.as_str())])?;
        let server_result = match self
            .http_client
            .post(url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(session.access_token.as_str())
            .send()
            .await
        {
            Ok(response) => check_response(response, EndpointKind::Auth)
                .await
                .map(|_| ()),
            Err(error) => Err(transport_error(&error)),
        };

        if let Err(error) = self.drop_session().await {
            warn!(error = %error, "failed to remove local tokens after sign-out");
        }
        self.emit(AuthEvent::SignedOut, None);
        server_result
    }

    async fn refresh_session(&self) -> AppResult<BackendSession> {
        let refresh_token = self
            .stored_session()
            .await?
            .map(|session| session.refresh_token)
            .ok_or_else(|| {
                AppError::Unauthorized(
                    "Invalid Refresh Token: Refresh Token Not Found".to_owned(),
                )
            })?;

        let session = self
            .request_token(
                "refresh_token",
                &serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;

        self.store_session(&session).await?;
        self.emit(AuthEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    async fn current_session(&self) -> AppResult<Option<BackendSession>> {
        let Some(session) = self.stored_session().await? else {
            return Ok(None);
        };

        if is_near_expiry(&session, Utc::now()) {
            debug!(user_id = %session.user.id, "stored access token near expiry, refreshing");
            return self.refresh_session().await.map(Some);
        }

        let user = self.fetch_user(session.access_token.as_str()).await?;
        let session = BackendSession { user, ..session };
        self.store_session(&session).await?;
        Ok(Some(session))
    }

    async fn clear_local_session(&self) -> AppResult<()> {
        self.drop_session().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}
