//! Logging setup for Carton
//!
//! This crate installs the global `tracing` subscriber: an `EnvFilter`
//! (`RUST_LOG` takes precedence over the configured level), a stderr
//! formatter in pretty or JSON form, and an optional non-blocking file sink.

use std::path::Path;
use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use carton_config::{LogFormat, LoggingSettings};
use common::error::Error;

static INITIALIZED: OnceCell<()> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer alive; drop it only at process exit
#[must_use = "dropping the guard stops the file writer"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Builds the level filter, preferring `RUST_LOG` when it is set
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("invalid log level '{}': {}", level, e)).into()),
    }
}

/// Initializes logging
///
/// Only the first call installs a subscriber; later calls are no-ops that
/// return an empty guard.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard> {
    if INITIALIZED.get().is_some() {
        return Ok(LoggingGuard { _file_guard: None });
    }

    let filter = build_filter(&settings.level)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match settings.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let mut file_guard = None;
    if let Some(path) = &settings.file {
        let (layer, guard) = file_layer(path)?;
        layers.push(layer);
        file_guard = Some(guard);
    }

    // Another subscriber (e.g. a test harness) may already be installed
    if Registry::default().with(layers).with(filter).try_init().is_ok() {
        debug!("Logging initialized at level {}", settings.level);
    }
    let _ = INITIALIZED.set(());

    Ok(LoggingGuard { _file_guard: file_guard })
}

fn file_layer(path: &Path) -> Result<(BoxedLayer, WorkerGuard)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("log file has no file name: {:?}", path)))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();

    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("info").is_ok());
        assert!(build_filter("carton=debug,warn").is_ok());
    }

    #[test]
    fn test_init_is_idempotent_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LoggingSettings {
            level: "debug".to_string(),
            format: LogFormat::Json,
            file: Some(dir.path().join("logs").join("carton.log")),
        };

        let _guard = init_logging(&settings).unwrap();
        assert!(dir.path().join("logs").is_dir());

        let _second = init_logging(&LoggingSettings::default()).unwrap();
    }
}
