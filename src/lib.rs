//! Carton: load packaged machine learning models and run inference
//!
//! A model is identified by a location and executed by a named runner. The
//! `Carton` type owns configuration and a runner registry; the free
//! [`load`] function does the same against a process-wide registry so a
//! caller can write
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! let model = carton::load("/tmp/somepath", "torchscript", None, None, "CPU").await?;
//! println!("{} runs on {}", model.name(), model.runner());
//! # Ok(())
//! # }
//! ```

pub mod commands;

use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::info;

use carton_config::{CartonSettings, ConfigManager};
use inference_engine::InferenceEngine;

pub use async_trait::async_trait;
pub use common::error::Error;
pub use common::tensor::{Tensor, TensorMap};
pub use common::types::{DataType, Device, GpuSelector, RunnerOpt};
pub use inference_engine::{
    IdentityRunner, LoadOpts, LoadRequest, Model, Runner, RunnerModel, RunnerRegistry, SealHandle,
};
pub use model_manager::{CartonInfo, Dimension, RunnerInfo, Shape, TensorSpec, MANIFEST_FILE};

static GLOBAL_REGISTRY: Lazy<Arc<RunnerRegistry>> =
    Lazy::new(|| Arc::new(RunnerRegistry::with_builtin_runners()));

/// Registers a runner with the process-wide registry used by [`load`]
pub fn register_runner(runner: Arc<dyn Runner>) {
    GLOBAL_REGISTRY.register(runner);
}

/// Loads a model using the process-wide registry and the default configuration
///
/// `visible_device` accepts `cpu`, `gpu`, `gpu:N`, `N` or a GPU UUID, in any
/// case.
pub async fn load(
    location: &str,
    runner: &str,
    runner_version: Option<&str>,
    runner_opts: Option<HashMap<String, RunnerOpt>>,
    visible_device: &str,
) -> Result<Model> {
    let carton = Carton::with_registry(ConfigManager::new()?, GLOBAL_REGISTRY.clone())?;
    carton
        .load(
            location,
            LoadOpts {
                override_runner_name: Some(runner.to_string()),
                override_required_framework_version: runner_version.map(str::to_string),
                override_runner_opts: runner_opts,
                visible_device: Some(visible_device.parse()?),
            },
        )
        .await
}

/// Configured entry point for loading models
pub struct Carton {
    /// Configuration manager
    config: Arc<ConfigManager>,

    /// Settings resolved from the configuration
    settings: CartonSettings,

    /// Engine performing loads
    engine: InferenceEngine,
}

impl Carton {
    /// Creates a Carton with the built-in runners
    pub fn new(config: ConfigManager) -> Result<Self> {
        Self::with_registry(config, Arc::new(RunnerRegistry::with_builtin_runners()))
    }

    /// Creates a Carton that resolves runners from `registry`
    pub fn with_registry(config: ConfigManager, registry: Arc<RunnerRegistry>) -> Result<Self> {
        let settings = config.settings()?;
        let engine = InferenceEngine::new(registry, &settings)?;

        info!(
            "Carton ready (config: {}, default device: {})",
            config
                .source_file()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string()),
            settings.default_visible_device
        );

        Ok(Self {
            config: Arc::new(config),
            settings,
            engine,
        })
    }

    /// Gets the configuration manager
    pub fn config(&self) -> Arc<ConfigManager> {
        self.config.clone()
    }

    pub fn settings(&self) -> &CartonSettings {
        &self.settings
    }

    /// Runner registry used by this instance
    pub fn registry(&self) -> &Arc<RunnerRegistry> {
        self.engine.registry()
    }

    /// Loads a model
    pub async fn load(&self, location: &str, opts: LoadOpts) -> Result<Model> {
        self.engine.load(location, opts).await
    }
}
