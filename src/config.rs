use crate::error::{MixerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "VMIX_API_URL";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8088/api";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Where to read state from when the live endpoint fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum FallbackSource {
    /// Snapshot compiled into the crate
    #[default]
    Bundled,
    /// XML file on disk
    File(PathBuf),
    /// Static XML served over HTTP
    Url(String),
    /// No fallback; a failed primary fetch is an error
    Disabled,
}

/// Client configuration
///
/// Deserializable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// API base URL, e.g. `http://192.168.1.16:8088/api`
    pub base_url: String,
    pub fallback: FallbackSource,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Only install results from the most recently started fetch
    pub discard_stale_fetches: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fallback: FallbackSource::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            discard_stale_fetches: false,
        }
    }
}

impl MixerConfig {
    /// Create a config for the given API base URL, other fields default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the base URL taken from `VMIX_API_URL` when set
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the source used when the live endpoint fails
    pub fn with_fallback(mut self, fallback: FallbackSource) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the per-request HTTP timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Only let the most recently started fetch install its result
    pub fn with_discard_stale_fetches(mut self, enabled: bool) -> Self {
        self.discard_stale_fetches = enabled;
        self
    }

    /// Polling interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check the config before use
    /// 
    /// Rejects an empty base URL and a zero poll interval.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(MixerError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(MixerError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
