use fleetops_application::StartupOutcome;
use fleetops_core::{AppError, Identity};

use crate::cli::LoginArgs;
use crate::console_services::ConsoleServices;

pub async fn login(services: &ConsoleServices, args: LoginArgs) -> Result<(), AppError> {
    let email = match args.email {
        Some(email) => email,
        None => services.auth.remembered_email().await?.ok_or_else(|| {
            AppError::Validation("no remembered email, pass --email".to_owned())
        })?,
    };

    let identity = services
        .auth
        .sign_in(email.as_str(), args.password.as_str(), args.remember_me)
        .await?;
    print_identity(&identity);
    Ok(())
}

pub async fn logout(services: &ConsoleServices) -> Result<(), AppError> {
    match services.auth.initialize().await {
        StartupOutcome::NoSession => {
            println!("Not signed in.");
            Ok(())
        }
        StartupOutcome::SessionFound(_) | StartupOutcome::Error { .. } => {
            services.auth.sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
    }
}

pub async fn whoami(services: &ConsoleServices) -> Result<(), AppError> {
    let identity = require_session(services).await?;
    print_identity(&identity);
    Ok(())
}

pub async fn refresh(services: &ConsoleServices) -> Result<(), AppError> {
    require_session(services).await?;

    if !services.auth.refresh_token().await {
        return Err(AppError::Unauthorized(
            "session could not be renewed, sign in again".to_owned(),
        ));
    }

    let expires_at = services
        .auth
        .state()
        .session()
        .and_then(|session| session.expires_at);
    match expires_at {
        Some(expires_at) => println!("Session renewed until {expires_at}."),
        None => println!("Session renewed."),
    }
    Ok(())
}

/// Restores the stored session or explains why there is none.
pub(super) async fn require_session(services: &ConsoleServices) -> Result<Identity, AppError> {
    match services.auth.initialize().await {
        StartupOutcome::SessionFound(identity) => Ok(identity),
        StartupOutcome::NoSession => Err(AppError::Unauthorized(
            "not signed in, run `fleetops login`".to_owned(),
        )),
        StartupOutcome::Error {
            message,
            recovered,
            reload_required,
        } => {
            if recovered {
                println!("Stored credentials were unusable and have been cleared.");
            }
            if reload_required {
                println!("Run `fleetops login` to start a fresh session.");
            }
            Err(AppError::Unauthorized(message))
        }
    }
}

fn print_identity(identity: &Identity) {
    println!("{} <{}>", identity.display_name(), identity.email());
    println!("  id:   {}", identity.id());
    println!("  role: {}", identity.role());
    if let Some(expires_at) = identity.session_expires_at() {
        println!("  session expires: {expires_at}");
    }
}
