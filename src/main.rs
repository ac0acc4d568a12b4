mod app;
mod catalog;
mod cli;
mod config;
mod http;
mod limiter;
mod logging;
mod notify;
mod paths;
mod season;
mod snapshot;
mod watcher;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.log_level)?;
    app::run(cli).await
}
