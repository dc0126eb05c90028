//! Tracing initialization.
//!
//! While the TUI owns the terminal, log output goes to a dated file under
//! the config directory; stdout logging would corrupt the display. The
//! one-shot subcommands log to stderr like any other CLI.

use anyhow::Result;
use fundline_gateways::storage::FundlinePaths;
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logging for one-shot subcommands.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// File-only logging for the kiosk. Returns the path being written to.
pub fn init_file() -> Result<std::path::PathBuf> {
    let dir = FundlinePaths::logs_dir()?;
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!(
        "fundline.log.{}",
        chrono::Local::now().format("%Y-%m-%d")
    ));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}
