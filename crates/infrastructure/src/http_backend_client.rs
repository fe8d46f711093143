//! HTTP adapter for the hosted identity and data backend.
//!
//! Speaks the backend's auth (`/auth/v1/*`), table (`/rest/v1/<table>`) and
//! RPC (`/rest/v1/rpc/<fn>`) endpoints. Session tokens are kept in memory and
//! mirrored to a JSON file so a later process can resume the session.

mod auth;
mod rest;
mod token_file;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use url::Url;

use fleetops_application::{AuthEvent, AuthStateChange, BackendSession};
use fleetops_core::{AppError, AppResult};

use token_file::TokenFile;

/// Which family of endpoints produced an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    Auth,
    Rest,
}

/// HTTP implementation of the auth, role and profile ports.
pub struct HttpBackendClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
    tokens: TokenFile,
    session: RwLock<Option<BackendSession>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl HttpBackendClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// Tokens are persisted to `token_path`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: Url,
        api_key: impl Into<String>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            http_client,
            base_url: with_trailing_slash(base_url),
            api_key: api_key.into(),
            tokens: TokenFile::new(token_path),
            session: RwLock::new(None),
            events,
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = self.base_url.join(path).map_err(|error| {
            AppError::Internal(format!("invalid backend endpoint '{path}': {error}"))
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Returns the in-memory session, falling back to the token file.
    async fn stored_session(&self) -> AppResult<Option<BackendSession>> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(Some(session));
        }

        let session = self.tokens.load().await?;
        if let Some(session) = &session {
            *self.session.write().await = Some(session.clone());
        }
        Ok(session)
    }

    async fn store_session(&self, session: &BackendSession) -> AppResult<()> {
        *self.session.write().await = Some(session.clone());
        self.tokens.save(session).await
    }

    async fn drop_session(&self) -> AppResult<()> {
        *self.session.write().await = None;
        self.tokens.clear().await
    }

    /// Bearer token for data requests: the user's access token when signed in,
    /// the project key otherwise.
    async fn bearer_token(&self) -> AppResult<String> {
        Ok(self
            .stored_session()
            .await?
            .map_or_else(|| self.api_key.clone(), |session| session.access_token))
    }

    fn emit(&self, event: AuthEvent, session: Option<BackendSession>) {
        // No receivers is not an error.
        let _ = self.events.send(AuthStateChange { event, session });
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(path.as_str());
    }
    url
}

/// Converts a non-success response into an application error.
async fn check_response(
    response: reqwest::Response,
    kind: EndpointKind,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
    Err(status_error(status, error_message(body.as_str()).as_str(), kind))
}

fn status_error(status: reqwest::StatusCode, message: &str, kind: EndpointKind) -> AppError {
    use reqwest::StatusCode;

    match (status, kind) {
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, EndpointKind::Auth)
        | (StatusCode::UNAUTHORIZED, _) => AppError::Unauthorized(message.to_owned()),
        (StatusCode::FORBIDDEN, EndpointKind::Auth) => AppError::Unauthorized(message.to_owned()),
        (StatusCode::FORBIDDEN, EndpointKind::Rest) => AppError::Forbidden(message.to_owned()),
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, EndpointKind::Rest) => {
            AppError::Validation(message.to_owned())
        }
        (StatusCode::NOT_FOUND, _) => AppError::NotFound(message.to_owned()),
        (StatusCode::CONFLICT, _) => AppError::Conflict(message.to_owned()),
        (StatusCode::TOO_MANY_REQUESTS, _) => AppError::RateLimited(message.to_owned()),
        _ => AppError::Internal(format!("backend responded with status {status}: {message}")),
    }
}

/// Extracts the most specific message from an error body.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_owned();
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .map_or_else(|| body.trim().to_owned(), str::to_owned)
}

fn transport_error(error: &reqwest::Error) -> AppError {
    AppError::Internal(format!("backend request failed: {error}"))
}
