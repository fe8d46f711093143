use fleetops_application::RoleManager;
use fleetops_core::AppError;
use fleetops_domain::{Role, role_names_match};

use crate::cli::RolesCommand;
use crate::console_services::ConsoleServices;

pub async fn run(services: &ConsoleServices, command: RolesCommand) -> Result<(), AppError> {
    let roles = &services.roles;
    roles.list_roles().await?;

    match command {
        RolesCommand::List { permissions } => {
            for role in roles.roles().await {
                print_role(&role, permissions);
            }
        }
        RolesCommand::Create { name, description } => {
            let role = roles.create_role(name.as_str(), description.as_str()).await?;
            println!("Created role '{}' ({}).", role.name, role.id);
        }
        RolesCommand::Copy { role, new_name } => {
            let source = resolve_role(roles, role.as_str()).await?;
            let copy = roles.copy_role(source.id.as_str(), new_name.as_str()).await?;
            println!(
                "Copied '{}' to '{}' with {} permissions.",
                source.name,
                copy.name,
                copy.enabled_permissions().len()
            );
        }
        RolesCommand::Rename {
            role,
            new_name,
            description,
        } => {
            let current = resolve_role(roles, role.as_str()).await?;
            let description = description.unwrap_or_else(|| current.description.clone());
            let updated = roles
                .update_role(current.id.as_str(), new_name.as_str(), description.as_str())
                .await?;
            println!("Renamed '{}' to '{}'.", current.name, updated.name);
        }
        RolesCommand::Delete { role } => {
            let role = resolve_role(roles, role.as_str()).await?;
            roles.delete_role(role.id.as_str()).await?;
            println!("Deleted role '{}'.", role.name);
        }
        RolesCommand::Grant { role, permission } => {
            let role = resolve_role(roles, role.as_str()).await?;
            roles
                .set_permission(role.id.as_str(), permission.as_str(), true)
                .await?;
            println!("Granted {permission} to '{}'.", role.name);
        }
        RolesCommand::Revoke { role, permission } => {
            let role = resolve_role(roles, role.as_str()).await?;
            roles
                .set_permission(role.id.as_str(), permission.as_str(), false)
                .await?;
            println!("Revoked {permission} from '{}'.", role.name);
        }
        RolesCommand::GrantCategory { role, category } => {
            let role = resolve_role(roles, role.as_str()).await?;
            roles
                .set_category_permissions(role.id.as_str(), category.as_str(), true)
                .await?;
            println!("Granted every {category} permission to '{}'.", role.name);
        }
        RolesCommand::RevokeCategory { role, category } => {
            let role = resolve_role(roles, role.as_str()).await?;
            roles
                .set_category_permissions(role.id.as_str(), category.as_str(), false)
                .await?;
            println!("Revoked every {category} permission from '{}'.", role.name);
        }
    }

    Ok(())
}

/// Finds a loaded role by id or by case-insensitive name.
pub(super) async fn resolve_role(roles: &RoleManager, reference: &str) -> Result<Role, AppError> {
    let reference = reference.trim();
    roles
        .roles()
        .await
        .into_iter()
        .find(|role| role.id == reference || role_names_match(role.name.as_str(), reference))
        .ok_or_else(|| AppError::NotFound(format!("role '{reference}' does not exist")))
}

fn print_role(role: &Role, list_permissions: bool) {
    let marker = if role.is_built_in { " [built-in]" } else { "" };
    println!(
        "{}{marker}  id={}  users={}",
        role.name, role.id, role.user_count
    );
    if !role.description.is_empty() {
        println!("  {}", role.description);
    }

    for summary in RoleManager::category_summary(role) {
        if summary.enabled == 0 {
            continue;
        }
        let scope = if summary.all_enabled { " (all)" } else { "" };
        println!(
            "  {:<14} {}/{}{scope}",
            summary.category, summary.enabled, summary.total
        );
    }

    if list_permissions {
        for key in role.enabled_permissions() {
            println!("    {key}");
        }
    }
}
