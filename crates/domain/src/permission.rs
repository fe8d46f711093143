//! Static permission catalog.
//!
//! Permission keys have the form `<domain>:<action>` and are grouped into
//! named categories for administrative screens. The catalog is closed: keys
//! outside of it are never granted by this client.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fleetops_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// A validated `<domain>:<action>` permission key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey(String);

impl PermissionKey {
    /// Parses a permission key, checking its shape but not catalog membership.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        let Some((domain, action)) = value.split_once(':') else {
            return Err(AppError::Validation(format!(
                "permission key '{value}' must have the form '<domain>:<action>'"
            )));
        };

        if !is_key_segment(domain) || !is_key_segment(action) {
            return Err(AppError::Validation(format!(
                "permission key '{value}' may only contain lowercase letters, digits and '_'"
            )));
        }

        Ok(Self(value.to_owned()))
    }

    /// Parses a key and requires that it belongs to the catalog.
    pub fn catalogued(value: &str) -> AppResult<Self> {
        let key = Self::parse(value)?;
        if !PermissionCatalog::contains(key.as_str()) {
            return Err(AppError::Validation(format!(
                "unknown permission '{}'",
                key.as_str()
            )));
        }

        Ok(key)
    }

    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_key_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        })
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<PermissionKey> for String {
    fn from(value: PermissionKey) -> Self {
        value.0
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One catalog entry with its operator-facing description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDescriptor {
    /// Stable permission key.
    pub key: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

/// Named group of permissions toggled together in the role editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionCategory {
    /// Category display name.
    pub name: &'static str,
    /// Permissions in display order.
    pub permissions: &'static [PermissionDescriptor],
}

impl PermissionCategory {
    /// Returns the number of permissions in the category.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the category is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Iterates over the category's keys.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.permissions.iter().map(|descriptor| descriptor.key)
    }
}

const fn permission(key: &'static str, description: &'static str) -> PermissionDescriptor {
    PermissionDescriptor { key, description }
}

static CATEGORIES: &[PermissionCategory] = &[
    PermissionCategory {
        name: "Bookings",
        permissions: &[
            permission("bookings:view", "View bookings and their history"),
            permission("bookings:create", "Create new bookings"),
            permission("bookings:edit", "Edit booking details and status"),
            permission("bookings:delete", "Cancel and delete bookings"),
            permission("bookings:assign", "Assign drivers and vehicles to bookings"),
        ],
    },
    PermissionCategory {
        name: "Vehicles",
        permissions: &[
            permission("vehicles:view", "View the vehicle fleet"),
            permission("vehicles:create", "Register new vehicles"),
            permission("vehicles:edit", "Edit vehicle details"),
            permission("vehicles:delete", "Retire and delete vehicles"),
        ],
    },
    PermissionCategory {
        name: "Drivers",
        permissions: &[
            permission("drivers:view", "View driver profiles"),
            permission("drivers:create", "Onboard new drivers"),
            permission("drivers:edit", "Edit driver profiles and documents"),
            permission("drivers:delete", "Remove drivers"),
        ],
    },
    PermissionCategory {
        name: "Invoices",
        permissions: &[
            permission("invoices:view", "View invoices"),
            permission("invoices:create", "Create invoices"),
            permission("invoices:edit", "Edit draft invoices"),
            permission("invoices:send", "Send invoices to customers"),
        ],
    },
    PermissionCategory {
        name: "Complaints",
        permissions: &[
            permission("complaints:view", "View customer complaints"),
            permission("complaints:respond", "Respond to complaints"),
            permission("complaints:resolve", "Close and resolve complaints"),
        ],
    },
    PermissionCategory {
        name: "Quality Reviews",
        permissions: &[
            permission("quality:view", "View quality reviews"),
            permission("quality:review", "Create and score quality reviews"),
        ],
    },
    PermissionCategory {
        name: "API Users",
        permissions: &[
            permission("api_users:view", "View API users and keys"),
            permission("api_users:manage", "Create, rotate and revoke API users"),
        ],
    },
    PermissionCategory {
        name: "Users",
        permissions: &[
            permission("users:view", "View operator accounts"),
            permission("users:create", "Invite operators"),
            permission("users:edit", "Edit operators and their roles"),
            permission("users:delete", "Deactivate operators"),
        ],
    },
    PermissionCategory {
        name: "Roles",
        permissions: &[
            permission("roles:view", "View roles and permissions"),
            permission("roles:manage", "Create, edit and delete roles"),
        ],
    },
];

/// Read-only access to the closed permission catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionCatalog;

impl PermissionCatalog {
    /// Returns all categories in display order.
    #[must_use]
    pub fn categories() -> &'static [PermissionCategory] {
        CATEGORIES
    }

    /// Finds a category by name, ignoring case.
    #[must_use]
    pub fn category(name: &str) -> Option<&'static PermissionCategory> {
        let name = name.trim();
        CATEGORIES
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(name))
    }

    /// Returns every key in the catalog.
    pub fn all_keys() -> impl Iterator<Item = &'static str> {
        CATEGORIES.iter().flat_map(PermissionCategory::keys)
    }

    /// Returns whether the key belongs to the catalog.
    #[must_use]
    pub fn contains(key: &str) -> bool {
        Self::all_keys().any(|candidate| candidate == key)
    }

    /// Returns the description for a key.
    #[must_use]
    pub fn describe(key: &str) -> Option<&'static str> {
        CATEGORIES
            .iter()
            .flat_map(|category| category.permissions.iter())
            .find(|descriptor| descriptor.key == key)
            .map(|descriptor| descriptor.description)
    }

    /// Returns the category that owns a key.
    #[must_use]
    pub fn category_of(key: &str) -> Option<&'static PermissionCategory> {
        CATEGORIES
            .iter()
            .find(|category| category.keys().any(|candidate| candidate == key))
    }

    /// Returns the number of permissions in a category, zero when unknown.
    #[must_use]
    pub fn total_in_category(name: &str) -> usize {
        Self::category(name).map_or(0, PermissionCategory::len)
    }
}
