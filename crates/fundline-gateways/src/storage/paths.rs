//! Path resolution for Fundline's configuration and logs.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/fundline/          # Config directory
//! ├── config.toml              # Application configuration
//! └── logs/                    # Log files while the TUI owns the terminal
//! ```

use fundline_core::error::{FundlineError, Result};
use std::path::PathBuf;

/// Unified path management for Fundline.
pub struct FundlinePaths;

impl FundlinePaths {
    /// Returns the Fundline configuration directory for the platform.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("fundline"))
            .ok_or_else(|| FundlineError::config("cannot determine the user config directory"))
    }

    /// Returns the path of the configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
