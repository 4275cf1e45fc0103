//! Typed view of the Carton configuration

use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use common::error::Error;
use common::types::Device;

/// Resolved Carton settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartonSettings {
    /// Device used when a load request does not name one
    pub default_visible_device: String,

    /// Upper bound on a single runner load, in seconds
    pub load_timeout_secs: u64,

    /// Whether inputs are checked against the model's declared signature
    pub strict_signatures: bool,

    /// Logging settings
    pub log: LoggingSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Level or filter directive (`info`, `carton=debug`, ...)
    pub level: String,

    /// Output format
    pub format: LogFormat,

    /// Optional log file; stderr only when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: crate::defaults::DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl CartonSettings {
    /// Load timeout as a duration
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Parsed default device
    pub fn default_device(&self) -> Result<Device> {
        Ok(self.default_visible_device.parse::<Device>()?)
    }

    /// Checks the settings for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.load_timeout_secs == 0 {
            return Err(Error::Config("load_timeout_secs must be greater than zero".to_string()).into());
        }

        self.default_device()
            .map_err(|e| Error::Config(format!("default_visible_device: {}", e)))?;

        if self.log.level.trim().is_empty() {
            return Err(Error::Config("log.level must not be empty".to_string()).into());
        }

        Ok(())
    }
}
