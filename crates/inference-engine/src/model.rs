//! Loaded model handle
//!
//! A `Model` is what a successful load returns. It is owned by the caller,
//! carries the model's descriptive fields, and runs inference synchronously
//! through the runner that loaded it. Dropping the handle releases the
//! runner's model.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use anyhow::Result;
use dashmap::DashMap;
use semver::Version;
use tracing::debug;

use common::error::Error;
use common::tensor::TensorMap;
use common::types::Device;
use common::utils::{format_duration, measure_execution_time};
use model_manager::CartonInfo;

use crate::runner::RunnerModel;
use crate::signature::validate_inputs;

/// Refers to inputs stored with `Model::seal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SealHandle(u64);

impl SealHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SealHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seal#{}", self.0)
    }
}

/// A loaded, ready-to-invoke model
pub struct Model {
    /// Human-readable model name
    name: String,

    /// Runner identifier
    runner: String,

    /// Framework version of the runner that loaded the model
    runner_version: Version,

    /// Device the model was placed on
    device: Device,

    /// Model description
    info: Arc<CartonInfo>,

    /// Whether inputs are checked against the declared signature
    strict_signatures: bool,

    /// Runner-side model
    inner: Box<dyn RunnerModel>,

    /// Inputs stored by `seal`, waiting for `infer_with_handle`
    sealed: DashMap<SealHandle, TensorMap>,

    next_handle: AtomicU64,
}

impl Model {
    pub(crate) fn new(
        name: String,
        runner: String,
        runner_version: Version,
        device: Device,
        info: Arc<CartonInfo>,
        strict_signatures: bool,
        inner: Box<dyn RunnerModel>,
    ) -> Self {
        Self {
            name,
            runner,
            runner_version,
            device,
            info,
            strict_signatures,
            inner,
            sealed: DashMap::new(),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Human-readable model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the runner executing this model
    pub fn runner(&self) -> &str {
        &self.runner
    }

    pub fn runner_version(&self) -> &Version {
        &self.runner_version
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Full model description
    pub fn info(&self) -> &CartonInfo {
        &self.info
    }

    /// Runs inference on named inputs
    pub fn infer_with_inputs(&self, inputs: TensorMap) -> Result<TensorMap> {
        self.check_inputs(&inputs)?;
        self.run(inputs)
    }

    /// Checks and stores inputs for a later `infer_with_handle`
    pub fn seal(&self, inputs: TensorMap) -> Result<SealHandle> {
        self.check_inputs(&inputs)?;

        let handle = SealHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        debug!("Sealed {} input(s) for {} as {}", inputs.len(), self.name, handle);
        self.sealed.insert(handle, inputs);

        Ok(handle)
    }

    /// Runs inference on previously sealed inputs
    ///
    /// Each handle can be used once.
    pub fn infer_with_handle(&self, handle: SealHandle) -> Result<TensorMap> {
        let (_, inputs) = self
            .sealed
            .remove(&handle)
            .ok_or_else(|| Error::NotFound(format!("unknown or already used handle {}", handle)))?;
        self.run(inputs)
    }

    fn check_inputs(&self, inputs: &TensorMap) -> Result<()> {
        match (&self.info.inputs, self.strict_signatures) {
            (Some(specs), true) => validate_inputs(specs, inputs),
            _ => Ok(()),
        }
    }

    fn run(&self, inputs: TensorMap) -> Result<TensorMap> {
        let (outputs, elapsed) = measure_execution_time(|| self.inner.infer(inputs))?;
        debug!(
            "Inference on {} produced {} output(s) in {}",
            self.name,
            outputs.len(),
            format_duration(elapsed)
        );
        Ok(outputs)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("runner", &self.runner)
            .field("runner_version", &self.runner_version.to_string())
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}
