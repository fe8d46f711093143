use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fleetops_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_STATE_DIR: &str = ".fleetops";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub backend_url: Url,
    pub api_key: String,
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
}

impl ConsoleConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let backend_url = required_non_empty(&lookup, "FLEETOPS_BACKEND_URL")?;
        let backend_url = Url::parse(backend_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid FLEETOPS_BACKEND_URL: {error}"))
        })?;
        if !matches!(backend_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "FLEETOPS_BACKEND_URL must use http or https, got '{}'",
                backend_url.scheme()
            )));
        }

        let api_key = required_non_empty(&lookup, "FLEETOPS_API_KEY")?;

        let state_dir = lookup("FLEETOPS_STATE_DIR")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);

        let http_timeout = match lookup("FLEETOPS_HTTP_TIMEOUT_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid FLEETOPS_HTTP_TIMEOUT_SECS: {error}"))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            backend_url,
            api_key,
            state_dir,
            http_timeout: Duration::from_secs(http_timeout.max(1)),
        })
    }

    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join("tokens.json")
    }
}

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
