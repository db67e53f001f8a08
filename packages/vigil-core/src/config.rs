//! Library configuration.
//!
//! [`Config`] holds the tunables shared by the REST client, the command
//! poller and the live-view facade. All fields have defaults matching the
//! vendor API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, LIVEVIEW_CONFIG_PATH, REQUEST_TIMEOUT_SECS,
    REST_BASE_URL,
};

/// Configuration for the Vigil core library.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // REST
    /// Base URL template for the REST API (`{{tier}}` is substituted).
    pub api_base_url: String,

    /// Path template for live-view descriptor resolution.
    pub liveview_config_path: String,

    /// Per-request timeout (seconds).
    pub request_timeout_secs: u64,

    // Commands
    /// Wait between two command status requests (milliseconds).
    pub poll_interval_ms: u64,

    /// Number of status requests before a command is reported as timed out.
    pub poll_max_attempts: u32,

    // Events
    /// Capacity of the broadcast channel used for session/command events.
    pub event_channel_capacity: usize,
}

impl Config {
    /// Returns the command poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the REST request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_max_attempts == 0 {
            return Err("poll_max_attempts must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if !self.api_base_url.ends_with('/') {
            return Err("api_base_url must end with '/'".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: REST_BASE_URL.to_string(),
            liveview_config_path: LIVEVIEW_CONFIG_PATH.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_attempts: DEFAULT_POLL_ATTEMPTS,
            event_channel_capacity: 64,
        }
    }
}
