//! Session store backed by JSON files in a local state directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use fleetops_application::{SessionStore, StoredSession};
use fleetops_core::{AppError, AppResult};

use crate::private_file::write_private;

const SESSION_FILE: &str = "session.json";
const REMEMBERED_EMAIL_FILE: &str = "remembered_email.json";

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    directory: PathBuf,
}

impl FileSessionStore {
    /// Creates a store writing into `directory`, created on first save.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the state directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    async fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> AppResult<Option<T>> {
        let path = self.directory.join(file_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read '{}': {error}",
                    path.display()
                )));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "discarding unreadable state file"
                );
                self.remove(file_name).await?;
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to create state directory '{}': {error}",
                    self.directory.display()
                ))
            })?;

        let bytes = serde_json::to_vec_pretty(value).map_err(|error| {
            AppError::Internal(format!("failed to encode '{file_name}': {error}"))
        })?;
        let path = self.directory.join(file_name);
        write_private(&path, &bytes).await.map_err(|error| {
            AppError::Internal(format!("failed to write '{}': {error}", path.display()))
        })
    }

    async fn remove(&self, file_name: &str) -> AppResult<()> {
        let path = self.directory.join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to remove '{}': {error}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        self.read_json(SESSION_FILE).await
    }

    async fn save(&self, session: &StoredSession) -> AppResult<()> {
        self.write_json(SESSION_FILE, session).await
    }

    async fn clear(&self) -> AppResult<()> {
        self.remove(SESSION_FILE).await
    }

    async fn remembered_email(&self) -> AppResult<Option<String>> {
        self.read_json(REMEMBERED_EMAIL_FILE).await
    }

    async fn remember_email(&self, email: &str) -> AppResult<()> {
        self.write_json(REMEMBERED_EMAIL_FILE, &email).await
    }

    async fn forget_email(&self) -> AppResult<()> {
        self.remove(REMEMBERED_EMAIL_FILE).await
    }
}
