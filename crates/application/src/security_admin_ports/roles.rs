/// Role row returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    /// Stable role identifier.
    pub role_id: String,
    /// Unique role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Indicates a role shipped with the system.
    pub is_built_in: bool,
}

/// Permission row returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    /// Stable permission identifier.
    pub permission_id: String,
    /// Permission key, such as `bookings:edit`.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Grant edge linking a role to a permission by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionEdge {
    /// Role identifier.
    pub role_id: String,
    /// Permission key.
    pub permission_name: String,
}
