use async_trait::async_trait;
use tokio::sync::RwLock;

use fleetops_application::{SessionStore, StoredSession};
use fleetops_core::AppResult;

/// In-memory session store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session: RwLock<Option<StoredSession>>,
    remembered_email: RwLock<Option<String>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> AppResult<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn remembered_email(&self) -> AppResult<Option<String>> {
        Ok(self.remembered_email.read().await.clone())
    }

    async fn remember_email(&self, email: &str) -> AppResult<()> {
        *self.remembered_email.write().await = Some(email.to_owned());
        Ok(())
    }

    async fn forget_email(&self) -> AppResult<()> {
        *self.remembered_email.write().await = None;
        Ok(())
    }
}
