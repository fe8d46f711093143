use fleetops_core::AppError;

use super::roles::resolve_role;
use crate::cli::UsersCommand;
use crate::console_services::ConsoleServices;

pub async fn run(services: &ConsoleServices, command: UsersCommand) -> Result<(), AppError> {
    match command {
        UsersCommand::List => {
            let users = services.users.list_users().await?;
            if users.is_empty() {
                println!("No users.");
            }
            for user in users {
                println!(
                    "[{:<2}] {:<24} {:<32} {:<14} {}",
                    user.initials, user.name, user.email, user.role, user.id
                );
            }
        }
        UsersCommand::SetRole { user_id, role } => {
            services.roles.list_roles().await?;
            let role = resolve_role(&services.roles, role.as_str()).await?;
            services
                .users
                .set_user_role(user_id.as_str(), role.id.as_str())
                .await?;
            println!("Assigned '{}' to {user_id}.", role.name);
        }
    }

    Ok(())
}
