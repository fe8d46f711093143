mod profiles;
mod repositories;
mod roles;

pub use profiles::ProfileRecord;
pub use repositories::{ProfileRepository, RoleRepository};
pub use roles::{PermissionRecord, RolePermissionEdge, RoleRecord};
