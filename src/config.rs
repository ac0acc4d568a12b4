use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;
use crate::watcher::clamp_seasons;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error("missing Pushover {0}: pass --pushover-{0} or set PUSHOVER_{upper}", upper = .0.to_uppercase())]
    MissingCredential(&'static str),
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("catalog URL must use http or https: '{0}'")]
    InvalidCatalogUrl(String),
}

#[derive(Debug, Clone)]
pub(crate) struct WatcherConfig {
    pub(crate) seasons: u32,
    pub(crate) poll_interval: Duration,
    pub(crate) min_request_gap: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) catalog_url: String,
    pub(crate) state_file: PathBuf,
}

#[derive(Clone)]
pub(crate) struct PushoverConfig {
    pub(crate) token: String,
    pub(crate) user: String,
}

pub(crate) struct AppConfig {
    pub(crate) watcher: WatcherConfig,
    pub(crate) pushover: PushoverConfig,
}

impl AppConfig {
    pub(crate) fn from_cli(cli: &Cli, state_file: PathBuf) -> Result<Self, ConfigError> {
        if cli.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let catalog_url = cli.catalog_url.trim().to_string();
        if !(catalog_url.starts_with("http://") || catalog_url.starts_with("https://")) {
            return Err(ConfigError::InvalidCatalogUrl(catalog_url));
        }

        let token = required(cli.pushover_token.as_deref(), "token")?;
        let user = required(cli.pushover_user.as_deref(), "user")?;

        Ok(Self {
            watcher: WatcherConfig {
                seasons: clamp_seasons(cli.seasons),
                poll_interval: Duration::from_secs(cli.interval_secs),
                min_request_gap: Duration::from_millis(cli.min_request_gap_ms),
                request_timeout: Duration::from_secs(cli.request_timeout_secs.max(1)),
                catalog_url,
                state_file,
            },
            pushover: PushoverConfig { token, user },
        })
    }
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
