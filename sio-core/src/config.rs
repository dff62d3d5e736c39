//! Client configuration management.
//!
//! Holds the connection timeouts and retry policies that callers may tune
//! before connecting, plus logging settings. Configuration can be persisted
//! as TOML on disk.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{SioError, SioResult};

/// Top-level client configuration.
///
/// All connection settings must be in place before `connect()` is called;
/// changes made afterwards only apply to the next connect attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How long a connect attempt may stay in `Connecting` before the
    /// connect watchdog abandons it, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long the client tolerates silence between server heartbeats
    /// before declaring the session dead, in milliseconds.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    /// Reconnect automatically when a connect attempt times out.
    #[serde(default)]
    pub retry_on_connect_timeout: bool,

    /// Reconnect automatically when the heartbeat watchdog fires.
    #[serde(default)]
    pub retry_on_heartbeat_timeout: bool,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, file logging is disabled.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output for the file layer.
    #[serde(default)]
    pub json_output: bool,
}

fn default_connect_timeout_ms() -> u64 {
    constants::DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_heartbeat_timeout_ms() -> u64 {
    constants::DEFAULT_HEARTBEAT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            retry_on_connect_timeout: false,
            retry_on_heartbeat_timeout: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl ClientConfig {
    /// The connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// The heartbeat timeout as a [`Duration`].
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> SioResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> SioResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SioError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configured values.
    pub fn validate(&self) -> SioResult<()> {
        if self.connect_timeout_ms == 0 {
            return Err(SioError::Config(
                "connect_timeout_ms must be non-zero".into(),
            ));
        }
        if self.heartbeat_timeout_ms == 0 {
            return Err(SioError::Config(
                "heartbeat_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
