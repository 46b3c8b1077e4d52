//! Where the service keeps its files.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "classroom";
const CONFIG_FILE: &str = "config.toml";
const REPORTS_DIR: &str = "reports";

/// `<config dir>/classroom/config.toml`
pub fn config_file() -> Result<PathBuf> {
    let base = dirs::config_dir().context("No config directory on this system")?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// Spreadsheets default to `<data dir>/classroom/reports`, or the XDG data
/// path under home when the platform reports no data directory.
pub fn reports_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .context("No data or home directory to keep reports in")?;
    Ok(base.join(APP_DIR).join(REPORTS_DIR))
}
