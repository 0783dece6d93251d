use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use egglink_core::{CoercionPolicy, StatusPolicy};
use egglink_core::status::{DEFAULT_ALARM_THRESHOLD, DEFAULT_ONLINE_WINDOW_SECS};
use serde::Deserialize;

use crate::store::DEFAULT_MAX_HISTORY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub status: StatusConfig,
    pub normalizer: NormalizerConfig,
    pub forward: ForwardConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Readings kept per device before the oldest is evicted
    pub max_history: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Seconds after its last reading during which a device counts as online
    pub online_window_secs: u64,
    /// Particulate level above which a device raises the fire alarm
    pub alarm_threshold: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// `zero` or `keep`
    pub on_parse_failure: CoercionPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Webhook receiving every accepted reading. Forwarding is off when unset.
    pub url: Option<String>,
    pub timeout_secs: u64,
    /// Readings waiting to be forwarded before new ones are dropped
    pub queue_capacity: usize,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_history == 0 {
            return Err(ConfigError::Invalid("store.max_history must be at least 1"));
        }
        if i64::try_from(self.status.online_window_secs).is_err() {
            return Err(ConfigError::Invalid("status.online_window_secs is too large"));
        }
        if !self.status.alarm_threshold.is_finite() {
            return Err(ConfigError::Invalid("status.alarm_threshold must be finite"));
        }
        if self.forward.timeout_secs == 0 {
            return Err(ConfigError::Invalid("forward.timeout_secs must be at least 1"));
        }
        if self.forward.queue_capacity == 0 {
            return Err(ConfigError::Invalid("forward.queue_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn max_history(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.store.max_history).unwrap_or(DEFAULT_MAX_HISTORY)
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::new(self.status.online_window_secs, self.status.alarm_threshold)
    }
}

impl ForwardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY.get(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            online_window_secs: DEFAULT_ONLINE_WINDOW_SECS,
            alarm_threshold: DEFAULT_ALARM_THRESHOLD,
        }
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 5,
            queue_capacity: 256,
        }
    }
}
