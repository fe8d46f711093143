//! FleetOps operator console.

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod console_config;
mod console_services;

use clap::Parser;
use fleetops_core::AppError;
use tracing::debug;

use crate::cli::Cli;
use crate::console_config::{ConsoleConfig, init_tracing};
use crate::console_services::build_console_services;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ConsoleConfig::load()?;
    debug!(
        backend_url = %config.backend_url,
        state_dir = %config.state_dir.display(),
        "console configuration loaded"
    );

    let services = build_console_services(&config)?;
    commands::run(cli.command, &services).await
}
