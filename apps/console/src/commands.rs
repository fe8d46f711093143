mod catalog;
mod roles;
mod session;
mod users;

use fleetops_core::AppError;

use crate::cli::Command;
use crate::console_services::ConsoleServices;

pub async fn run(command: Command, services: &ConsoleServices) -> Result<(), AppError> {
    match command {
        Command::Login(args) => session::login(services, args).await,
        Command::Logout => session::logout(services).await,
        Command::Whoami => session::whoami(services).await,
        Command::Refresh => session::refresh(services).await,
        Command::Catalog { check_backend } => catalog::show(services, check_backend).await,
        Command::Roles(command) => {
            session::require_session(services).await?;
            roles::run(services, command).await
        }
        Command::Users(command) => {
            session::require_session(services).await?;
            users::run(services, command).await
        }
    }
}
