//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod permission;
mod role;
mod user;

pub use permission::{PermissionCatalog, PermissionCategory, PermissionDescriptor, PermissionKey};
pub use role::{DEFAULT_ROLE_NAME, Role, role_names_match, validate_role_name};
pub use user::{AVATAR_PALETTE, EmailAddress, avatar_color, email_local_part, initials};
