use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application-level profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: String,
    email: String,
    display_name: String,
    role: String,
    session_expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates an identity from authentication and profile data.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            role: role.into(),
            session_expires_at: None,
        }
    }

    /// Returns a copy carrying the given session expiry.
    #[must_use]
    pub fn with_session_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.session_expires_at = expires_at;
        self
    }

    /// Returns the stable user identifier issued by the backend.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the sign-in email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the assigned role name.
    #[must_use]
    pub fn role(&self) -> &str {
        self.role.as_str()
    }

    /// Returns the session expiry, when known.
    #[must_use]
    pub fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.session_expires_at
    }

    /// Returns whether the session expiry is in the past.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.session_expires_at
            .is_some_and(|expires_at| expires_at <= now)
    }
}
