use std::path::PathBuf;

use clap::Parser;

use crate::catalog::jikan::DEFAULT_BASE_URL;

#[derive(Debug, Parser)]
#[command(
    name = "anitrack-watch",
    version,
    about = "Watch seasonal anime and get a push notification when they finish airing"
)]
pub struct Cli {
    /// trace, debug, info, warning, error or fatal; RUST_LOG takes precedence
    #[arg(long, env = "ANITRACK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seasons walked back from the current one when building the first list (1-40)
    #[arg(long, env = "ANITRACK_SEASONS", default_value_t = 1)]
    pub seasons: u32,

    /// Seconds between two batches
    #[arg(long, env = "ANITRACK_INTERVAL_SECS", default_value_t = 24 * 60 * 60)]
    pub interval_secs: u64,

    /// Minimum gap between two catalog requests, in milliseconds (0 disables throttling)
    #[arg(long, env = "ANITRACK_MIN_REQUEST_GAP_MS", default_value_t = 4_000)]
    pub min_request_gap_ms: u64,

    #[arg(long, env = "ANITRACK_REQUEST_TIMEOUT_SECS", default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Where the watch list is kept between runs
    #[arg(long, env = "ANITRACK_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    #[arg(long, env = "ANITRACK_CATALOG_URL", default_value = DEFAULT_BASE_URL)]
    pub catalog_url: String,

    #[arg(long, env = "PUSHOVER_TOKEN", hide_env_values = true)]
    pub pushover_token: Option<String>,

    #[arg(long, env = "PUSHOVER_USER", hide_env_values = true)]
    pub pushover_user: Option<String>,
}
