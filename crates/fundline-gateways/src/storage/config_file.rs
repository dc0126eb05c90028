//! Configuration file handling.
//!
//! Loads `config.toml`, fills in defaults for anything missing, and writes
//! updates atomically (tmp file + fsync + rename) so a crash mid-save never
//! leaves a torn config behind. Environment variables override the file.

use super::paths::FundlinePaths;
use fundline_core::config::FundlineConfig;
use fundline_core::error::{FundlineError, Result};
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::PathBuf;

/// Handle to a TOML configuration file.
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file at the platform's default location.
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(FundlinePaths::config_file()?))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the file. Missing or empty files are `None`, not errors.
    pub fn load(&self) -> Result<Option<FundlineConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let config = toml::from_str(&content)
            .map_err(|err| FundlineError::config(format!("TOML parse error: {err}")))?;
        Ok(Some(config))
    }

    /// Loads the file (defaults when absent), then applies environment
    /// overrides. This is what the binary calls at startup.
    pub fn load_or_default(&self) -> Result<FundlineConfig> {
        let mut config = self.load()?.unwrap_or_default();
        apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Writes the config atomically: serialize to a tmp file next to the
    /// target, fsync, then rename over it.
    pub fn save(&self, config: &FundlineConfig) -> Result<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|err| FundlineError::config(format!("TOML serialization error: {err}")))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("toml.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Applies `FUNDLINE_*` environment overrides on top of the loaded config.
pub fn apply_env_overrides(config: &mut FundlineConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut FundlineConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("FUNDLINE_API_URL") {
        config.ledger.base_url = url;
    }
    if let Some(url) = lookup("FUNDLINE_AUTH_URL") {
        config.identity.base_url = url;
    }
    if let Some(url) = lookup("FUNDLINE_PAY_URL") {
        config.payment.base_url = url;
    }
    if let Some(goal) = lookup("FUNDLINE_FUNDING_GOAL") {
        match goal.parse::<f64>() {
            Ok(goal) if goal > 0.0 => config.feed.funding_goal_dollars = Some(goal),
            _ => tracing::warn!(value = %goal, "ignoring unparsable FUNDLINE_FUNDING_GOAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::new(dir.path().join("config.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::new(dir.path().join("nested").join("config.toml"));

        let mut config = FundlineConfig::default();
        config.ledger.base_url = "https://donate.example.org".to_string();
        config.feed.funding_goal_dollars = Some(2000.0);
        file.save(&config).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn env_overrides_win_over_the_file() {
        let mut config = FundlineConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("FUNDLINE_API_URL", "https://api.example.org"),
            ("FUNDLINE_FUNDING_GOAL", "1500"),
        ]);
        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ledger.base_url, "https://api.example.org");
        assert_eq!(config.feed.funding_goal_dollars, Some(1500.0));
    }

    #[test]
    fn bad_goal_override_is_ignored() {
        let mut config = FundlineConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([("FUNDLINE_FUNDING_GOAL", "plenty")]);
        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));
        assert!(config.feed.funding_goal_dollars.is_none());
    }
}
