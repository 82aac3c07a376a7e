//! Client configuration

use crate::request::DEFAULT_MAX_RESULT_WINDOW;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Endpoint and instrumentation settings for an [`crate::EsClient`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsClientConfig {
    /// Cluster HTTP endpoints, used round-robin
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Operations slower than this are logged as warnings
    #[serde(default = "default_slow_request_threshold")]
    pub slow_request_threshold_ms: u64,

    /// How long `stop` waits for in-flight operations before closing the transport
    #[serde(default = "default_stop_grace_period")]
    pub stop_grace_period_ms: u64,

    /// Largest `from + size` a search may request; raise it together with the
    /// indices' `index.max_result_window`
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    60000
}

fn default_slow_request_threshold() -> u64 {
    1000
}

fn default_stop_grace_period() -> u64 {
    5000
}

fn default_max_result_window() -> usize {
    DEFAULT_MAX_RESULT_WINDOW
}

impl Default for EsClientConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            slow_request_threshold_ms: default_slow_request_threshold(),
            stop_grace_period_ms: default_stop_grace_period(),
            max_result_window: default_max_result_window(),
            username: None,
            password: None,
        }
    }
}

impl EsClientConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EsClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            anyhow::bail!("at least one host is required");
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("hosts must not be blank");
        }
        if self.max_result_window == 0 {
            anyhow::bail!("max_result_window must be positive");
        }
        if self.password.is_some() && self.username.is_none() {
            anyhow::bail!("password given without username");
        }
        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_threshold_ms)
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }
}
