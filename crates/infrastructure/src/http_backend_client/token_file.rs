use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use fleetops_application::BackendSession;
use fleetops_core::{AppError, AppResult};

use crate::private_file::write_private;

/// JSON file holding the backend session tokens.
#[derive(Debug, Clone)]
pub(super) struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub(super) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the stored session. An unreadable file counts as no session.
    pub(super) async fn load(&self) -> AppResult<Option<BackendSession>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read token file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "token file is unreadable, ignoring it"
                );
                Ok(None)
            }
        }
    }

    pub(super) async fn save(&self, session: &BackendSession) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create token directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let bytes = serde_json::to_vec(session)
            .map_err(|error| AppError::Internal(format!("failed to encode tokens: {error}")))?;
        write_private(&self.path, &bytes).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write token file '{}': {error}",
                self.path.display()
            ))
        })
    }

    pub(super) async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to remove token file '{}': {error}",
                self.path.display()
            ))),
        }
    }
}
