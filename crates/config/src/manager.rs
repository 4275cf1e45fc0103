//! Configuration manager
//!
//! Layers, lowest precedence first: built-in defaults, the config file,
//! `CARTON_*` environment variables, explicit overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Result;
use config::{Config, Environment, File};
use tracing::debug;

use common::error::Error;

use crate::defaults;
use crate::settings::CartonSettings;

/// Layered configuration for Carton
pub struct ConfigManager {
    /// Merged configuration
    config: Config,

    /// File the configuration was read from, if any
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Creates a configuration manager reading the user config file if present
    pub fn new() -> Result<Self> {
        Self::load(None, &[])
    }

    /// Creates a configuration manager reading an explicit config file
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(Some(path), &[])
    }

    /// Creates a configuration manager from every layer
    ///
    /// An explicit file must exist; without one the user config file is read
    /// if present.
    pub fn load(file: Option<&Path>, overrides: &[(&str, &str)]) -> Result<Self> {
        match file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!("Config file not found: {:?}", path)).into());
                }
                Self::build(Some(path), defaults::ENV_PREFIX, overrides)
            }
            None => {
                let default_file = defaults::default_config_file();
                Self::build(default_file.as_deref(), defaults::ENV_PREFIX, overrides)
            }
        }
    }

    /// Creates a configuration manager from defaults plus explicit overrides only
    ///
    /// Neither the config file nor the environment is consulted.
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Result<Self> {
        let mut builder = Self::defaults()?;
        for (key, value) in overrides {
            builder = builder
                .set_override(*key, *value)
                .map_err(|e| Error::Config(e.to_string()))?;
        }
        Self::finish(builder, None)
    }

    pub(crate) fn build(
        file: Option<&Path>,
        env_prefix: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self> {
        let mut builder = Self::defaults()?;

        if let Some(path) = file {
            debug!("Reading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        for (key, value) in overrides {
            builder = builder
                .set_override(*key, *value)
                .map_err(|e| Error::Config(e.to_string()))?;
        }

        Self::finish(builder, file.filter(|p| p.exists()).map(Path::to_path_buf))
    }

    fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>> {
        Config::builder()
            .set_default("default_visible_device", defaults::DEFAULT_VISIBLE_DEVICE)
            .and_then(|b| b.set_default("load_timeout_secs", defaults::DEFAULT_LOAD_TIMEOUT_SECS))
            .and_then(|b| b.set_default("strict_signatures", defaults::DEFAULT_STRICT_SIGNATURES))
            .and_then(|b| b.set_default("log.level", defaults::DEFAULT_LOG_LEVEL))
            .and_then(|b| b.set_default("log.format", defaults::DEFAULT_LOG_FORMAT))
            .map_err(|e| Error::Config(e.to_string()).into())
    }

    fn finish(
        builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
        source_file: Option<PathBuf>,
    ) -> Result<Self> {
        let config = builder
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let manager = Self { config, source_file };
        manager.settings()?.validate()?;
        Ok(manager)
    }

    /// Typed settings
    pub fn settings(&self) -> Result<CartonSettings> {
        self.config
            .clone()
            .try_deserialize::<CartonSettings>()
            .map_err(|e| Error::Config(e.to_string()).into())
    }

    /// File the configuration was read from
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Gets a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.config
            .get_string(key)
            .map_err(|e| Error::Config(format!("{}: {}", key, e)).into())
    }

    /// Gets a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.config
            .get_bool(key)
            .map_err(|e| Error::Config(format!("{}: {}", key, e)).into())
    }

    /// Gets a non-negative integer value
    pub fn get_u64(&self, key: &str) -> Result<u64> {
        let value = self
            .config
            .get_int(key)
            .map_err(|e| Error::Config(format!("{}: {}", key, e)))?;
        u64::try_from(value)
            .map_err(|_| Error::Config(format!("{}: expected a non-negative integer", key)).into())
    }

    /// Gets a duration stored as whole seconds
    pub fn get_duration(&self, key: &str) -> Result<Duration> {
        self.get_u64(key).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LogFormat;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let manager = ConfigManager::with_overrides(&[]).unwrap();
        let settings = manager.settings().unwrap();

        assert_eq!(settings.default_visible_device, "cpu");
        assert_eq!(settings.load_timeout_secs, 300);
        assert!(settings.strict_signatures);
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(settings.log.file.is_none());
        assert!(manager.source_file().is_none());
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "load_timeout_secs = 12\nstrict_signatures = false\n[log]\nformat = \"json\"\n"
        )
        .unwrap();

        let manager = ConfigManager::build(Some(file.path()), "CARTON_TEST_FILE_LAYER", &[]).unwrap();
        let settings = manager.settings().unwrap();

        assert_eq!(settings.load_timeout(), Duration::from_secs(12));
        assert!(!settings.strict_signatures);
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.log.level, "info");
        assert_eq!(manager.get_duration("load_timeout_secs").unwrap(), Duration::from_secs(12));
    }

    #[test]
    fn test_env_layer() {
        std::env::set_var("CARTON_TEST_ENV_LAYER_DEFAULT_VISIBLE_DEVICE", "gpu:1");
        std::env::set_var("CARTON_TEST_ENV_LAYER_LOG__LEVEL", "debug");

        let manager = ConfigManager::build(None, "CARTON_TEST_ENV_LAYER", &[]).unwrap();

        assert_eq!(manager.get_string("default_visible_device").unwrap(), "gpu:1");
        assert_eq!(manager.get_string("log.level").unwrap(), "debug");
    }

    #[test]
    fn test_overrides_win_and_are_validated() {
        let manager = ConfigManager::with_overrides(&[("strict_signatures", "false")]).unwrap();
        assert!(!manager.get_bool("strict_signatures").unwrap());

        let err = ConfigManager::with_overrides(&[("load_timeout_secs", "0")]).err().unwrap();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));

        let err = ConfigManager::with_overrides(&[("default_visible_device", "tpu")]).err().unwrap();
        assert!(err.to_string().contains("default_visible_device"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigManager::from_file(Path::new("/nonexistent/carton.toml")).err().unwrap();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));
    }
}
