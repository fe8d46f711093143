//! Role entity and its permission matrix.

use std::collections::BTreeMap;

use fleetops_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::permission::{PermissionCatalog, PermissionCategory};

/// Role assigned when no profile record names one.
pub const DEFAULT_ROLE_NAME: &str = "Customer";

/// Returns whether two role names refer to the same role.
#[must_use]
pub fn role_names_match(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Validates a role name for creation or rename.
///
/// The name must be non-empty and not collide, ignoring case, with any name
/// yielded by `existing`.
pub fn validate_role_name<'a>(
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> AppResult<NonEmptyString> {
    let name = NonEmptyString::new(name)
        .map_err(|_| AppError::Validation("role name must not be empty".to_owned()))?;

    if existing
        .into_iter()
        .any(|candidate| role_names_match(candidate, name.as_str()))
    {
        return Err(AppError::Validation(format!(
            "a role named '{}' already exists",
            name.as_str()
        )));
    }

    Ok(name)
}

/// Role with its full permission matrix over the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable backend role identifier.
    pub id: String,
    /// Unique role name, compared ignoring case.
    pub name: String,
    /// Operator-facing description.
    pub description: String,
    /// Built-in roles cannot be edited, renamed or deleted.
    pub is_built_in: bool,
    /// Every catalog key mapped to its grant state.
    pub permissions: BTreeMap<String, bool>,
    /// Number of users assigned to the role. Derived, not authoritative.
    pub user_count: usize,
}

impl Role {
    /// Creates a role with every catalog permission disabled.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        is_built_in: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            is_built_in,
            permissions: PermissionCatalog::all_keys()
                .map(|key| (key.to_owned(), false))
                .collect(),
            user_count: 0,
        }
    }

    /// Enables the granted keys that belong to the catalog.
    ///
    /// Returns the granted keys that were not recognised.
    pub fn apply_grants<'a>(&mut self, granted: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut unknown = Vec::new();
        for key in granted {
            match self.permissions.get_mut(key) {
                Some(enabled) => *enabled = true,
                None => unknown.push(key.to_owned()),
            }
        }

        unknown
    }

    /// Returns whether a key is granted.
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        self.permissions.get(key).copied().unwrap_or(false)
    }

    /// Sets a catalog key. Unknown keys are ignored and reported as `false`.
    pub fn set_enabled(&mut self, key: &str, enabled: bool) -> bool {
        match self.permissions.get_mut(key) {
            Some(slot) => {
                *slot = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns granted keys in catalog order.
    #[must_use]
    pub fn enabled_permissions(&self) -> Vec<&'static str> {
        PermissionCatalog::all_keys()
            .filter(|key| self.is_enabled(key))
            .collect()
    }

    /// Counts granted keys in a category.
    #[must_use]
    pub fn count_enabled_in_category(&self, category: &PermissionCategory) -> usize {
        category.keys().filter(|key| self.is_enabled(key)).count()
    }

    /// Returns whether every key of a non-empty category is granted.
    #[must_use]
    pub fn all_enabled_in_category(&self, category: &PermissionCategory) -> bool {
        !category.is_empty() && category.keys().all(|key| self.is_enabled(key))
    }

    /// Rejects mutation of built-in roles.
    pub fn ensure_editable(&self) -> AppResult<()> {
        if self.is_built_in {
            return Err(AppError::Forbidden(format!(
                "role '{}' is built-in and cannot be modified",
                self.name
            )));
        }

        Ok(())
    }
}
