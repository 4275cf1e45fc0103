//! Model location resolution
//!
//! This module turns a caller-supplied location into a model path plus the
//! `CartonInfo` describing it, reading the manifest when one is present.

use std::path::{Path, PathBuf};
use anyhow::Result;
use tracing::{debug, info};

use common::error::Error;

use crate::metadata::{CartonInfo, MANIFEST_FILE};

/// A model location that has been checked and described
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    /// Filesystem path handed to the runner
    pub path: PathBuf,

    /// Model description
    pub info: CartonInfo,

    /// Whether `info` came from a manifest file
    pub has_manifest: bool,
}

/// Resolves model locations
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Manifest file name looked up inside model directories
    manifest_name: String,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader {
    /// Creates a loader looking for `carton.toml`
    pub fn new() -> Self {
        Self {
            manifest_name: MANIFEST_FILE.to_string(),
        }
    }

    /// Creates a loader looking for a differently named manifest
    pub fn with_manifest_name(manifest_name: impl Into<String>) -> Self {
        Self {
            manifest_name: manifest_name.into(),
        }
    }

    /// Resolves a location
    ///
    /// A directory with a manifest is described by that manifest. Anything
    /// else (a bare file, or a directory without a manifest) needs
    /// `runner_override` to say how it should be run.
    pub async fn resolve(&self, location: &str, runner_override: Option<&str>) -> Result<ResolvedModel> {
        let path = parse_location(location)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("Model location not found: {:?}", path)).into());
            }
            Err(e) => return Err(Error::Io(e).into()),
        };

        let manifest_path = path.join(&self.manifest_name);
        if metadata.is_dir() && tokio::fs::try_exists(&manifest_path).await.map_err(Error::Io)? {
            debug!("Reading manifest {:?}", manifest_path);
            let info = CartonInfo::from_file(&manifest_path).await?;
            return Ok(ResolvedModel {
                path,
                info,
                has_manifest: true,
            });
        }

        let runner = runner_override.ok_or_else(|| {
            Error::Manifest(format!(
                "{:?} has no {} and no runner was given",
                path, self.manifest_name
            ))
        })?;

        info!("No manifest at {:?}, treating it as a {} model", path, runner);
        let info = CartonInfo::for_runner(runner, default_model_name(&path));
        info.validate()?;

        Ok(ResolvedModel {
            path,
            info,
            has_manifest: false,
        })
    }
}

/// Accepts plain paths and `file://` URLs
fn parse_location(location: &str) -> Result<PathBuf> {
    let location = location.trim();
    if location.is_empty() {
        return Err(Error::InvalidArgument("model location must not be empty".to_string()).into());
    }

    if let Some(path) = location.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }

    if let Some((scheme, _)) = location.split_once("://") {
        return Err(Error::InvalidArgument(format!(
            "unsupported location scheme '{}' in {}",
            scheme, location
        ))
        .into());
    }

    Ok(PathBuf::from(location))
}

/// File stem for files, final component for directories
fn default_model_name(path: &Path) -> String {
    let name = if path.is_dir() {
        path.file_name()
    } else {
        path.file_stem()
    };

    name.and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(MANIFEST_FILE),
            "model_name = \"adder\"\n[runner]\nrunner_name = \"identity\"\n",
        )
        .await
        .unwrap();

        let loader = ModelLoader::new();
        let resolved = loader
            .resolve(dir.path().to_str().unwrap(), Some("torchscript"))
            .await
            .unwrap();

        assert!(resolved.has_manifest);
        assert_eq!(resolved.path, dir.path());
        assert_eq!(resolved.info.model_name.as_deref(), Some("adder"));
        // Overrides are applied later, by the engine
        assert_eq!(resolved.info.runner.runner_name, "identity");
    }

    #[tokio::test]
    async fn test_bare_file_needs_runner() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resnet.pt");
        tokio::fs::write(&file, b"weights").await.unwrap();
        let location = format!("file://{}", file.display());

        let resolved = ModelLoader::new()
            .resolve(&location, Some("torchscript"))
            .await
            .unwrap();
        assert!(!resolved.has_manifest);
        assert_eq!(resolved.info.model_name.as_deref(), Some("resnet"));
        assert_eq!(resolved.info.runner.runner_name, "torchscript");

        let err = ModelLoader::new().resolve(&location, None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Manifest(_))));

        let err = ModelLoader::new().resolve(&location, Some("  ")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Manifest(_))));
    }

    #[tokio::test]
    async fn test_directory_without_manifest_uses_dir_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("somepath");
        tokio::fs::create_dir(&dir).await.unwrap();

        let resolved = ModelLoader::new()
            .resolve(dir.to_str().unwrap(), Some("torchscript"))
            .await
            .unwrap();
        assert_eq!(resolved.info.model_name.as_deref(), Some("somepath"));
    }

    #[tokio::test]
    async fn test_custom_manifest_name() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("model.toml"), "[runner]\nrunner_name = \"identity\"\n")
            .await
            .unwrap();

        let resolved = ModelLoader::with_manifest_name("model.toml")
            .resolve(dir.path().to_str().unwrap(), None)
            .await
            .unwrap();
        assert!(resolved.has_manifest);
    }

    #[tokio::test]
    async fn test_bad_locations() {
        let loader = ModelLoader::new();

        let err = loader.resolve("   ", Some("identity")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));

        let err = loader.resolve("s3://bucket/model", Some("identity")).await.unwrap_err();
        assert!(err.to_string().contains("unsupported location scheme 's3'"));

        let err = loader
            .resolve("/definitely/not/a/carton/model", Some("identity"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<Error>().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_broken_manifest_names_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(MANIFEST_FILE), "[runner]\n").await.unwrap();

        let err = ModelLoader::new()
            .resolve(dir.path().to_str().unwrap(), None)
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Manifest(_))));
        assert!(err.to_string().contains(MANIFEST_FILE));
    }

    #[tokio::test]
    async fn test_unreadable_manifest_names_file() {
        let loader = ModelLoader::new();

        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join(MANIFEST_FILE)).await.unwrap();
        let err = loader.resolve(dir.path().to_str().unwrap(), None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Manifest(_))));
        assert!(err.to_string().contains(MANIFEST_FILE));

        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(MANIFEST_FILE), [0xff, 0xfe, b'\n'])
            .await
            .unwrap();
        let err = loader.resolve(dir.path().to_str().unwrap(), None).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Manifest(_))));
        assert!(err.to_string().contains(MANIFEST_FILE));
    }
}
