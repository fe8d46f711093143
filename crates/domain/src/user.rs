//! User display helpers and email validation.

use fleetops_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Returns the part of an email before `@`, or the whole value without one.
#[must_use]
pub fn email_local_part(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// Avatar palette used for user badges.
pub const AVATAR_PALETTE: &[&str] = &[
    "#2563eb", "#16a34a", "#d97706", "#dc2626", "#7c3aed", "#0891b2", "#db2777", "#4b5563",
];

/// Picks a stable palette color for a user id.
#[must_use]
pub fn avatar_color(user_id: &str) -> &'static str {
    let digest = Sha256::digest(user_id.as_bytes());
    let index = usize::from(digest[0]) % AVATAR_PALETTE.len();
    AVATAR_PALETTE[index]
}

/// Derives up to two uppercase initials from a display name.
///
/// Falls back to the first letter of the email when the name is blank.
#[must_use]
pub fn initials(name: &str, email: &str) -> String {
    let from_name: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|token| token.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if !from_name.is_empty() {
        return from_name;
    }

    email
        .chars()
        .next()
        .map(|character| character.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_owned())
}

#[cfg(test)]
mod tests {
    use super::{AVATAR_PALETTE, EmailAddress, avatar_color, email_local_part, initials};

    #[test]
    fn email_is_normalised() {
        let email = EmailAddress::new("  Ops@Example.COM ");
        assert_eq!(
            email.map(String::from).unwrap_or_default(),
            "ops@example.com"
        );
    }

    #[test]
    fn email_rejects_missing_domain_dot() {
        assert!(EmailAddress::new("ops@localhost").is_err());
        assert!(EmailAddress::new("@example.com").is_err());
        assert!(EmailAddress::new("ops@a@b.com").is_err());
    }

    #[test]
    fn local_part_strips_domain() {
        assert_eq!(email_local_part("jane.doe@example.com"), "jane.doe");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn initials_use_first_two_tokens() {
        assert_eq!(initials("jane van doe", ""), "JV");
        assert_eq!(initials("Cher", ""), "C");
        assert_eq!(initials("   ", "max@example.com"), "M");
        assert_eq!(initials("", ""), "?");
    }

    #[test]
    fn avatar_color_is_stable_and_from_palette() {
        let first = avatar_color("user-42");
        assert_eq!(first, avatar_color("user-42"));
        assert!(AVATAR_PALETTE.contains(&first));
    }
}
