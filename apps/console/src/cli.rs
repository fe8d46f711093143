use clap::{Args, Parser, Subcommand};

/// Operator console for FleetOps access control.
#[derive(Debug, Parser)]
#[command(name = "fleetops", version)]
#[command(about = "Sign in and administer FleetOps roles and permissions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login(LoginArgs),
    /// Sign out of every session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Renew the session tokens
    Refresh,
    /// Show the permission catalog
    Catalog {
        /// Compare the catalog with the backend permission table
        #[arg(long)]
        check_backend: bool,
    },
    /// Role administration
    #[command(subcommand)]
    Roles(RolesCommand),
    /// User role assignment
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email, defaults to the remembered one
    #[arg(short, long)]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "FLEETOPS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Keep the session for 30 days and remember the email
    #[arg(long)]
    pub remember_me: bool,
}

#[derive(Debug, Subcommand)]
pub enum RolesCommand {
    /// List roles with their grant summary
    List {
        /// Print every granted permission
        #[arg(long)]
        permissions: bool,
    },
    /// Create a role with no permissions
    Create {
        /// Role name
        name: String,
        /// Role description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Copy a role and its permissions under a new name
    Copy {
        /// Source role name or id
        role: String,
        /// Name of the copy
        new_name: String,
    },
    /// Rename a role and replace its description
    Rename {
        /// Role name or id
        role: String,
        /// New name
        new_name: String,
        /// New description, keeps the current one when omitted
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a role no user is assigned to
    Delete {
        /// Role name or id
        role: String,
    },
    /// Grant one permission
    Grant {
        /// Role name or id
        role: String,
        /// Permission key, e.g. `bookings:view`
        permission: String,
    },
    /// Revoke one permission
    Revoke {
        /// Role name or id
        role: String,
        /// Permission key, e.g. `bookings:view`
        permission: String,
    },
    /// Grant every permission of a category
    GrantCategory {
        /// Role name or id
        role: String,
        /// Category name, e.g. `Bookings`
        category: String,
    },
    /// Revoke every permission of a category
    RevokeCategory {
        /// Role name or id
        role: String,
        /// Category name, e.g. `Bookings`
        category: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users and their roles
    List,
    /// Assign a role to a user
    SetRole {
        /// User id
        user_id: String,
        /// Role name or id
        role: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, RolesCommand, UsersCommand};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_category_grant() {
        let cli = Cli::try_parse_from(["fleetops", "roles", "grant-category", "Dispatcher", "Bookings"]);

        assert!(matches!(
            cli.map(|cli| cli.command),
            Ok(Command::Roles(RolesCommand::GrantCategory { role, category }))
                if role == "Dispatcher" && category == "Bookings"
        ));
    }

    #[test]
    fn parses_user_role_assignment() {
        let cli = Cli::try_parse_from(["fleetops", "-v", "users", "set-role", "u-1", "Admin"]);

        let Ok(cli) = cli else {
            panic!("arguments did not parse");
        };
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Users(UsersCommand::SetRole { user_id, role }) if user_id == "u-1" && role == "Admin"
        ));
    }

    #[test]
    fn login_requires_password() {
        let cli = Cli::try_parse_from(["fleetops", "login", "--email", "ops@example.com"]);

        if std::env::var_os("FLEETOPS_PASSWORD").is_none() {
            assert!(cli.is_err());
        }
    }
}
