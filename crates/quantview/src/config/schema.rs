use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest polling interval accepted from configuration.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Per-tick limit for status fetches while polling. Unset means a slow
    /// fetch only delays the next tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_request_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_request_timeout(&self) -> Option<Duration> {
        self.poll_request_timeout_secs.map(Duration::from_secs)
    }
}
