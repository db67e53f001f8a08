//! Relay configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use vigil_core::AccountContext;

/// Relay configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bearer token of the authenticated session.
    /// Override: `VIGIL_TOKEN`
    pub token: Option<String>,

    /// Account the token belongs to.
    /// Override: `VIGIL_ACCOUNT_ID`
    pub account_id: Option<u64>,

    /// REST tier (`prod`, `u011`, ...).
    /// Override: `VIGIL_TIER`
    pub tier: Option<String>,

    /// Base URL template of the REST API.
    pub api_base_url: Option<String>,

    /// Wait between two command status requests (milliseconds).
    /// Override: `VIGIL_POLL_INTERVAL_MS`
    pub poll_interval_ms: u64,

    /// Status requests before a command is reported as timed out.
    pub poll_max_attempts: u32,

    /// Per-request timeout (seconds).
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let core = vigil_core::Config::default();
        Self {
            token: None,
            account_id: None,
            tier: None,
            api_base_url: None,
            poll_interval_ms: core.poll_interval_ms,
            poll_max_attempts: core.poll_max_attempts,
            request_timeout_secs: core.request_timeout_secs,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from `lookup` (the process environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("VIGIL_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }

        if let Some(val) = lookup("VIGIL_ACCOUNT_ID") {
            if let Ok(id) = val.parse() {
                self.account_id = Some(id);
            }
        }

        if let Some(tier) = lookup("VIGIL_TIER") {
            self.tier = Some(tier);
        }

        if let Some(val) = lookup("VIGIL_POLL_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.poll_interval_ms = interval;
            }
        }
    }

    /// Builds the account context. Fails when the credentials are incomplete.
    pub fn account(&self) -> Result<AccountContext> {
        let Some(token) = self.token.as_deref().filter(|t| !t.trim().is_empty()) else {
            bail!("No API token configured (set VIGIL_TOKEN or `token` in the config file)");
        };
        let Some(account_id) = self.account_id else {
            bail!("No account id configured (set VIGIL_ACCOUNT_ID or `account_id`)");
        };

        let mut account = AccountContext::new(token, account_id);
        if let Some(ref tier) = self.tier {
            account = account.with_tier(tier);
        }
        Ok(account)
    }

    /// Converts to vigil-core's Config type.
    pub fn to_core_config(&self) -> vigil_core::Config {
        let mut config = vigil_core::Config {
            poll_interval_ms: self.poll_interval_ms,
            poll_max_attempts: self.poll_max_attempts,
            request_timeout_secs: self.request_timeout_secs,
            ..Default::default()
        };
        if let Some(ref base) = self.api_base_url {
            config.api_base_url = base.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn yaml_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(
            &path,
            "token: abc123\naccount_id: 42\ntier: u011\npoll_max_attempts: 8\n",
        )
        .unwrap();

        let config = RelayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.poll_max_attempts, 8);
        assert_eq!(config.poll_interval_ms, 1000);

        let account = config.account().unwrap();
        assert_eq!(account.account_id(), 42);
        assert_eq!(account.tier(), "u011");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RelayConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = RelayConfig {
            token: Some("from-file".into()),
            account_id: Some(1),
            ..Default::default()
        };
        config.apply_overrides(env(&[
            ("VIGIL_TOKEN", "from-env"),
            ("VIGIL_ACCOUNT_ID", "77"),
            ("VIGIL_POLL_INTERVAL_MS", "250"),
            ("VIGIL_TIER", "u014"),
        ]));

        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.account_id, Some(77));
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.tier.as_deref(), Some("u014"));
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        let mut config = RelayConfig::default();
        config.apply_overrides(env(&[("VIGIL_ACCOUNT_ID", "abc"), ("VIGIL_POLL_INTERVAL_MS", "")]));
        assert_eq!(config.account_id, None);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn missing_credentials_are_reported() {
        let config = RelayConfig {
            account_id: Some(1),
            ..Default::default()
        };
        assert!(config.account().is_err());

        let config = RelayConfig {
            token: Some("t".into()),
            ..Default::default()
        };
        assert!(config.account().is_err());
    }

    #[test]
    fn core_config_carries_overrides() {
        let config = RelayConfig {
            poll_interval_ms: 10,
            api_base_url: Some("http://127.0.0.1:9000/".into()),
            ..Default::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.poll_interval_ms, 10);
        assert_eq!(core.api_base_url, "http://127.0.0.1:9000/");
        assert!(core.validate().is_ok());
    }
}
