//! Built-in configuration defaults

/// Environment variable prefix (`CARTON_LOAD_TIMEOUT_SECS`, `CARTON_LOG__LEVEL`, ...)
pub const ENV_PREFIX: &str = "CARTON";

/// Separator for nested keys in environment variables
pub const ENV_SEPARATOR: &str = "__";

/// Default device when the caller does not name one
pub const DEFAULT_VISIBLE_DEVICE: &str = "cpu";

/// Default upper bound on a runner load, in seconds
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 300;

/// Default for input signature enforcement
pub const DEFAULT_STRICT_SIGNATURES: bool = true;

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log format
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

/// Location of the user config file (`$XDG_CONFIG_HOME/carton/config.toml`)
pub fn default_config_file() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("carton").join("config.toml"))
}
