//! Identity runner
//!
//! Returns its inputs unchanged. Useful for checking that a model directory,
//! its manifest and its signature are wired up before a real framework is
//! involved.

use anyhow::Result;
use async_trait::async_trait;
use semver::Version;
use tracing::debug;

use common::error::Error;
use common::tensor::TensorMap;
use common::types::Device;

use crate::runner::{LoadRequest, Runner, RunnerModel};

/// Runner name
pub const IDENTITY_RUNNER: &str = "identity";

/// Option prefixing every output name
pub const OUTPUT_PREFIX_OPT: &str = "output_prefix";

/// CPU-only runner echoing its inputs
#[derive(Debug, Default)]
pub struct IdentityRunner;

impl IdentityRunner {
    pub fn new() -> Self {
        Self
    }
}

struct IdentityModel {
    output_prefix: String,
}

#[async_trait]
impl Runner for IdentityRunner {
    fn name(&self) -> &str {
        IDENTITY_RUNNER
    }

    fn framework_version(&self) -> Version {
        Version::new(1, 0, 0)
    }

    fn supports_device(&self, device: &Device) -> bool {
        device.is_cpu()
    }

    async fn load(&self, request: LoadRequest) -> Result<Box<dyn RunnerModel>> {
        let output_prefix = match request.runner_opts.get(OUTPUT_PREFIX_OPT) {
            None => String::new(),
            Some(opt) => opt
                .as_str()
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("{} must be a string, got {}", OUTPUT_PREFIX_OPT, opt))
                })?
                .to_string(),
        };

        debug!("Identity runner loaded {:?}", request.model_path);

        Ok(Box::new(IdentityModel { output_prefix }))
    }
}

impl RunnerModel for IdentityModel {
    fn infer(&self, inputs: TensorMap) -> Result<TensorMap> {
        if self.output_prefix.is_empty() {
            return Ok(inputs);
        }

        Ok(inputs
            .into_iter()
            .map(|(name, tensor)| (format!("{}{}", self.output_prefix, name), tensor))
            .collect())
    }
}
