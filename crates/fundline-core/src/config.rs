//! Application configuration model.
//!
//! Loading, env overrides and persistence live in `fundline-gateways`; this
//! is only the serde shape plus defaults that work against a local dev
//! backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerSettings {
    /// Base URL of the donation ledger backend.
    pub base_url: String,
    /// Per-request timeout, surfaced as a retryable failure when exceeded.
    pub request_timeout_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentitySettings {
    /// Base URL of the hosted identity service.
    pub base_url: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaymentSettings {
    /// Base URL of the payment processor's confirm endpoint.
    pub base_url: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedSettings {
    /// How often the total/recent feed is refetched.
    pub poll_interval_secs: u64,
    /// Optional campaign goal the fund monitor renders its progress bar
    /// against. Without a goal the bar runs in "unlimited" mode.
    pub funding_goal_dollars: Option<f64>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            funding_goal_dollars: None,
        }
    }
}

/// Root configuration, stored as `config.toml` in the Fundline config
/// directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FundlineConfig {
    pub ledger: LedgerSettings,
    pub identity: IdentitySettings,
    pub payment: PaymentSettings,
    pub feed: FeedSettings,
}

impl FundlineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.feed.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_dev_backend() {
        let config = FundlineConfig::default();
        assert_eq!(config.ledger.base_url, "http://localhost:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.feed.funding_goal_dollars.is_none());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: FundlineConfig = toml::from_str(
            r#"
            [ledger]
            base_url = "https://donate.example.org"

            [feed]
            funding_goal_dollars = 2000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.base_url, "https://donate.example.org");
        assert_eq!(config.ledger.request_timeout_secs, 30);
        assert_eq!(config.feed.funding_goal_dollars, Some(2000.0));
    }
}
