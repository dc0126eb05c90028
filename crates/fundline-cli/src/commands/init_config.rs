//! `init-config` subcommand: write a default config file for editing.

use anyhow::{Result, bail};
use fundline_core::config::FundlineConfig;
use fundline_gateways::storage::ConfigFile;
use std::path::PathBuf;

pub fn run(path_override: Option<&PathBuf>) -> Result<()> {
    let file = match path_override {
        Some(path) => ConfigFile::new(path.clone()),
        None => ConfigFile::at_default_location()?,
    };
    if file.path().exists() {
        bail!("config already exists at {}", file.path().display());
    }
    file.save(&FundlineConfig::default())?;
    println!("wrote {}", file.path().display());
    Ok(())
}
