use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn default_state_file() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("anitrack").join("watchlist.json"))
}
