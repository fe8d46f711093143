/// User profile row keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    /// User identifier shared with the identity backend.
    pub user_id: String,
    /// Display name, if set.
    pub name: Option<String>,
    /// Contact email, if stored on the profile.
    pub email: Option<String>,
    /// Assigned role name, if set.
    pub role: Option<String>,
}
