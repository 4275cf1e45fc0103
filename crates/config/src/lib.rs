//! Configuration management for Carton
//!
//! This crate provides layered configuration for Carton: built-in defaults,
//! an optional TOML file, and `CARTON_*` environment variables.

pub mod defaults;
pub mod manager;
pub mod settings;

// Re-export commonly used types
pub use manager::ConfigManager;
pub use settings::{CartonSettings, LogFormat, LoggingSettings};
