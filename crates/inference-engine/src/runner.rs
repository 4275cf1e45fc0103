//! Runner extension points
//!
//! A runner knows how to execute models for one framework. It is registered
//! under a name and a framework version, loads a model for a device, and
//! hands back a `RunnerModel` that performs inference.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use async_trait::async_trait;
use semver::Version;

use common::tensor::TensorMap;
use common::types::{Device, RunnerOpt};
use model_manager::CartonInfo;

/// Everything a runner needs to load a model
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Model file or directory
    pub model_path: PathBuf,

    /// Model description
    pub info: Arc<CartonInfo>,

    /// Manifest options merged with caller overrides
    pub runner_opts: HashMap<String, RunnerOpt>,

    /// Device the model must run on
    pub device: Device,
}

/// Pluggable model execution backend
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Identifier models refer to this runner by
    fn name(&self) -> &str;

    /// Version of the underlying framework
    fn framework_version(&self) -> Version;

    /// Runner interface version
    fn compat_version(&self) -> u64 {
        1
    }

    /// Whether this runner can place models on `device`
    fn supports_device(&self, device: &Device) -> bool;

    /// Loads a model
    async fn load(&self, request: LoadRequest) -> Result<Box<dyn RunnerModel>>;
}

/// A model loaded by a runner
pub trait RunnerModel: Send + Sync {
    /// Runs inference on named inputs, returning named outputs
    fn infer(&self, inputs: TensorMap) -> Result<TensorMap>;
}
