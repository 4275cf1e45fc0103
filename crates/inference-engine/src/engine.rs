//! Inference engine
//!
//! This module ties location resolution, runner selection and runner
//! loading together. `InferenceEngine::load` is the one suspending call a
//! caller makes; everything after it happens on the returned `Model`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tracing::{debug, info};

use carton_config::CartonSettings;
use common::types::{Device, RunnerOpt};
use common::utils::execute_with_timeout;
use model_manager::{parse_version_req, ModelLoader, RunnerRequirement};

use crate::model::Model;
use crate::registry::RunnerRegistry;
use crate::runner::LoadRequest;

/// Caller choices for a load
#[derive(Debug, Clone, Default)]
pub struct LoadOpts {
    /// Runner to use instead of the one the manifest names
    pub override_runner_name: Option<String>,

    /// Framework version requirement replacing the manifest's
    pub override_required_framework_version: Option<String>,

    /// Runner options merged over the manifest's, key by key
    pub override_runner_opts: Option<HashMap<String, RunnerOpt>>,

    /// Device to load onto; the configured default when unset
    pub visible_device: Option<Device>,
}

/// Loads models through registered runners
pub struct InferenceEngine {
    /// Runner registry
    registry: Arc<RunnerRegistry>,

    /// Location resolver
    loader: ModelLoader,

    /// Upper bound on a single runner load
    load_timeout: Duration,

    /// Whether loaded models check inputs against their signature
    strict_signatures: bool,

    /// Device used when a load does not name one
    default_device: Device,
}

impl InferenceEngine {
    /// Creates an engine from settings
    pub fn new(registry: Arc<RunnerRegistry>, settings: &CartonSettings) -> Result<Self> {
        Ok(Self {
            registry,
            loader: ModelLoader::new(),
            load_timeout: settings.load_timeout(),
            strict_signatures: settings.strict_signatures,
            default_device: settings.default_device()?,
        })
    }

    /// Overrides the load timeout
    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    /// Runner registry
    pub fn registry(&self) -> &Arc<RunnerRegistry> {
        &self.registry
    }

    /// Loads a model
    pub async fn load(&self, location: &str, opts: LoadOpts) -> Result<Model> {
        let resolved = self
            .loader
            .resolve(location, opts.override_runner_name.as_deref())
            .await?;

        let version_override = match opts.override_required_framework_version.as_deref() {
            Some(req) => Some(parse_version_req(Some(req))?),
            None => None,
        };
        let requirement = RunnerRequirement::from_info(&resolved.info.runner)
            .with_overrides(opts.override_runner_name.as_deref(), version_override);

        let device = opts.visible_device.unwrap_or_else(|| self.default_device.clone());
        let runner = self.registry.resolve(&requirement, &device)?;

        // Manifest options belong to the manifest's runner
        let switched = opts
            .override_runner_name
            .as_deref()
            .is_some_and(|name| name != resolved.info.runner.runner_name);
        let runner_opts = if switched {
            opts.override_runner_opts.clone().unwrap_or_default()
        } else {
            resolved.info.runner.merged_opts(opts.override_runner_opts.as_ref())
        };
        let name = resolved
            .info
            .model_name
            .clone()
            .unwrap_or_else(|| fallback_name(&resolved.path));
        debug!(
            "Loading {} from {:?} ({}) with {} option(s)",
            name,
            resolved.path,
            if resolved.has_manifest { "manifest" } else { "no manifest" },
            runner_opts.len()
        );
        let info = Arc::new(resolved.info);

        let request = LoadRequest {
            model_path: resolved.path,
            info: info.clone(),
            runner_opts,
            device: device.clone(),
        };
        let operation = format!("loading {} with runner {}", name, runner.name());
        let inner = execute_with_timeout(runner.load(request), self.load_timeout, &operation).await?;

        info!(
            "Loaded model {} with runner {} {} on {}",
            name,
            runner.name(),
            runner.framework_version(),
            device
        );

        Ok(Model::new(
            name,
            runner.name().to_string(),
            runner.framework_version(),
            device,
            info,
            self.strict_signatures,
            inner,
        ))
    }
}

fn fallback_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use semver::Version;

    use carton_config::ConfigManager;
    use common::error::Error;
    use common::tensor::{Tensor, TensorMap};
    use common::types::{DataType, GpuSelector};
    use model_manager::MANIFEST_FILE;

    use crate::runner::{Runner, RunnerModel};

    struct SlowRunner;

    #[async_trait]
    impl Runner for SlowRunner {
        fn name(&self) -> &str {
            "slow"
        }

        fn framework_version(&self) -> Version {
            Version::new(0, 1, 0)
        }

        fn supports_device(&self, _device: &Device) -> bool {
            true
        }

        async fn load(&self, _request: LoadRequest) -> Result<Box<dyn RunnerModel>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(Error::Internal("unreachable in tests".into()).into())
        }
    }

    /// Echoes the option names it was loaded with as empty outputs
    struct OptsRunner;

    struct OptsModel(Vec<String>);

    #[async_trait]
    impl Runner for OptsRunner {
        fn name(&self) -> &str {
            "opts"
        }

        fn framework_version(&self) -> Version {
            Version::new(1, 0, 0)
        }

        fn supports_device(&self, _device: &Device) -> bool {
            true
        }

        async fn load(&self, request: LoadRequest) -> Result<Box<dyn RunnerModel>> {
            Ok(Box::new(OptsModel(request.runner_opts.into_keys().collect())))
        }
    }

    impl RunnerModel for OptsModel {
        fn infer(&self, _inputs: TensorMap) -> Result<TensorMap> {
            self.0
                .iter()
                .map(|name| -> Result<(String, Tensor)> {
                    Ok((name.clone(), Tensor::zeros(DataType::Uint8, &[0])?))
                })
                .collect()
        }
    }

    fn engine(overrides: &[(&str, &str)]) -> InferenceEngine {
        let settings = ConfigManager::with_overrides(overrides).unwrap().settings().unwrap();
        InferenceEngine::new(Arc::new(RunnerRegistry::with_builtin_runners()), &settings).unwrap()
    }

    async fn model_dir(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(MANIFEST_FILE), manifest).await.unwrap();
        dir
    }

    const IDENTITY_MANIFEST: &str = r#"
model_name = "echo"

[runner]
runner_name = "identity"
required_framework_version = "^1"

[runner.opts]
output_prefix = "y_"

[[input]]
name = "a"
dtype = "int64"
shape = [4, 5]
"#;

    fn input() -> TensorMap {
        TensorMap::from([("a".to_string(), Tensor::arange(DataType::Int64, &[4, 5]).unwrap())])
    }

    #[tokio::test]
    async fn test_load_and_infer() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let model = engine(&[])
            .load(dir.path().to_str().unwrap(), LoadOpts::default())
            .await
            .unwrap();

        assert_eq!(model.name(), "echo");
        assert_eq!(model.runner(), "identity");
        assert_eq!(model.device(), &Device::Cpu);

        let outputs = model.infer_with_inputs(input()).unwrap();
        assert_eq!(outputs["y_a"], input()["a"]);
    }

    #[tokio::test]
    async fn test_runner_opts_override() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let opts = LoadOpts {
            override_runner_opts: Some(HashMap::from([(
                "output_prefix".to_string(),
                RunnerOpt::String("z_".to_string()),
            )])),
            ..Default::default()
        };

        let model = engine(&[]).load(dir.path().to_str().unwrap(), opts).await.unwrap();
        let outputs = model.infer_with_inputs(input()).unwrap();
        assert!(outputs.contains_key("z_a"));
    }

    #[tokio::test]
    async fn test_switching_runner_drops_manifest_opts() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let engine = engine(&[("strict_signatures", "false")]);
        engine.registry().register(Arc::new(OptsRunner));

        let switched = LoadOpts {
            override_runner_name: Some("opts".to_string()),
            ..Default::default()
        };
        let model = engine.load(dir.path().to_str().unwrap(), switched).await.unwrap();
        assert!(model.infer_with_inputs(input()).unwrap().is_empty());

        let with_own_opts = LoadOpts {
            override_runner_name: Some("opts".to_string()),
            override_runner_opts: Some(HashMap::from([("threads".to_string(), RunnerOpt::Integer(2))])),
            ..Default::default()
        };
        let model = engine.load(dir.path().to_str().unwrap(), with_own_opts).await.unwrap();
        let outputs = model.infer_with_inputs(input()).unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs.contains_key("threads"));

        // Naming the manifest's own runner keeps its options
        let same = LoadOpts {
            override_runner_name: Some("identity".to_string()),
            ..Default::default()
        };
        let model = engine.load(dir.path().to_str().unwrap(), same).await.unwrap();
        assert!(model.infer_with_inputs(input()).unwrap().contains_key("y_a"));
    }

    #[tokio::test]
    async fn test_selection_failures_surface() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let location = dir.path().to_str().unwrap();
        let engine = engine(&[]);

        let gpu = LoadOpts {
            visible_device: Some(Device::Gpu(GpuSelector::Index(0))),
            ..Default::default()
        };
        let err = engine.load(location, gpu).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DeviceUnavailable(_))));

        let newer = LoadOpts {
            override_required_framework_version: Some(">=2".to_string()),
            ..Default::default()
        };
        let err = engine.load(location, newer).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::RunnerVersion(_))));

        let unknown = LoadOpts {
            override_runner_name: Some("torchscript".to_string()),
            ..Default::default()
        };
        let err = engine.load(location, unknown).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownRunner(_))));
    }

    #[tokio::test]
    async fn test_default_device_from_settings() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let err = engine(&[("default_visible_device", "gpu")])
            .load(dir.path().to_str().unwrap(), LoadOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DeviceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_lenient_signatures() {
        let dir = model_dir(IDENTITY_MANIFEST).await;
        let model = engine(&[("strict_signatures", "false")])
            .load(dir.path().to_str().unwrap(), LoadOpts::default())
            .await
            .unwrap();

        let odd = TensorMap::from([("b".to_string(), Tensor::zeros(DataType::Float32, &[1]).unwrap())]);
        assert!(model.infer_with_inputs(odd).is_ok());
    }

    #[tokio::test]
    async fn test_load_timeout() {
        let dir = model_dir("[runner]\nrunner_name = \"slow\"\n").await;
        let engine = engine(&[]).with_load_timeout(Duration::from_millis(20));
        engine.registry().register(Arc::new(SlowRunner));

        let err = engine
            .load(dir.path().to_str().unwrap(), LoadOpts::default())
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<Error>().unwrap().is_timeout());
    }

    #[tokio::test]
    async fn test_manifest_without_name_uses_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("unnamed");
        tokio::fs::create_dir(&dir).await.unwrap();
        tokio::fs::write(dir.join(MANIFEST_FILE), "[runner]\nrunner_name = \"identity\"\n")
            .await
            .unwrap();

        let model = engine(&[]).load(dir.to_str().unwrap(), LoadOpts::default()).await.unwrap();
        assert_eq!(model.name(), "unnamed");
    }
}
