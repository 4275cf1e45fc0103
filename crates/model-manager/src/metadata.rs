//! Model metadata
//!
//! A model directory carries a `carton.toml` manifest describing the model,
//! the runner that executes it, and optionally its input/output signature:
//!
//! ```toml
//! model_name = "adder"
//!
//! [runner]
//! runner_name = "torchscript"
//! required_framework_version = ">=2.0"
//!
//! [runner.opts]
//! threads = 4
//!
//! [[input]]
//! name = "a"
//! dtype = "int64"
//! shape = ["batch", 5]
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use anyhow::Result;
use semver::VersionReq;
use serde::{Deserialize, Serialize};

use common::error::Error;
use common::types::{DataType, RunnerOpt};

/// Name of the manifest file inside a model directory
pub const MANIFEST_FILE: &str = "carton.toml";

/// Everything known about a packaged model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartonInfo {
    /// Human-readable model name
    #[serde(default)]
    pub model_name: Option<String>,

    /// One-line description
    #[serde(default)]
    pub short_description: Option<String>,

    /// Long-form description
    #[serde(default)]
    pub model_description: Option<String>,

    /// Runner that executes the model
    pub runner: RunnerInfo,

    /// Declared inputs; `None` means the signature is not checked
    #[serde(default, rename = "input", skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<TensorSpec>>,

    /// Declared outputs
    #[serde(default, rename = "output", skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<TensorSpec>>,
}

/// Runner selection for a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerInfo {
    /// Runner identifier (e.g. `torchscript`)
    pub runner_name: String,

    /// Acceptable framework versions
    #[serde(default = "any_version")]
    pub required_framework_version: VersionReq,

    /// Runner interface version the model was packed against
    #[serde(default)]
    pub runner_compat_version: Option<u64>,

    /// Runner options
    #[serde(default)]
    pub opts: Option<HashMap<String, RunnerOpt>>,
}

fn any_version() -> VersionReq {
    VersionReq::STAR
}

/// Declared tensor in a model signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    /// Input or output name
    pub name: String,

    /// Element type
    pub dtype: DataType,

    /// Expected shape
    #[serde(default)]
    pub shape: Shape,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Expected tensor shape
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawShape", into = "RawShape")]
pub enum Shape {
    /// Any rank, any dimensions (`"*"` or omitted)
    #[default]
    Any,
    /// Fixed rank with per-dimension constraints
    Dims(Vec<Dimension>),
}

/// One dimension of a shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDimension", into = "RawDimension")]
pub enum Dimension {
    /// Exact size
    Value(u64),
    /// Named size; every occurrence of the same symbol must agree
    Symbol(String),
    /// Any size (`"*"`)
    Any,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDimension {
    Value(u64),
    Symbol(String),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawShape {
    Symbol(String),
    Dims(Vec<Dimension>),
}

impl From<RawDimension> for Dimension {
    fn from(raw: RawDimension) -> Self {
        match raw {
            RawDimension::Value(v) => Dimension::Value(v),
            RawDimension::Symbol(s) if s == "*" => Dimension::Any,
            RawDimension::Symbol(s) => Dimension::Symbol(s),
        }
    }
}

impl From<Dimension> for RawDimension {
    fn from(dim: Dimension) -> Self {
        match dim {
            Dimension::Value(v) => RawDimension::Value(v),
            Dimension::Symbol(s) => RawDimension::Symbol(s),
            Dimension::Any => RawDimension::Symbol("*".to_string()),
        }
    }
}

impl TryFrom<RawShape> for Shape {
    type Error = String;

    fn try_from(raw: RawShape) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawShape::Symbol(s) if s == "*" => Ok(Shape::Any),
            RawShape::Symbol(s) => Err(format!("expected \"*\" or a list of dimensions, got \"{}\"", s)),
            RawShape::Dims(dims) => Ok(Shape::Dims(dims)),
        }
    }
}

impl From<Shape> for RawShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Any => RawShape::Symbol("*".to_string()),
            Shape::Dims(dims) => RawShape::Dims(dims),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Value(v) => write!(f, "{}", v),
            Dimension::Symbol(s) => write!(f, "{}", s),
            Dimension::Any => write!(f, "*"),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Any => write!(f, "*"),
            Shape::Dims(dims) => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl RunnerInfo {
    /// Runner info accepting any version of the named runner
    pub fn named(runner_name: impl Into<String>) -> Self {
        Self {
            runner_name: runner_name.into(),
            required_framework_version: any_version(),
            runner_compat_version: None,
            opts: None,
        }
    }

    /// Manifest options with `overrides` applied on top, key by key
    pub fn merged_opts(&self, overrides: Option<&HashMap<String, RunnerOpt>>) -> HashMap<String, RunnerOpt> {
        let mut opts = self.opts.clone().unwrap_or_default();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                opts.insert(key.clone(), value.clone());
            }
        }
        opts
    }
}

impl CartonInfo {
    /// Minimal info for a model with no manifest
    pub fn for_runner(runner_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            model_name: Some(model_name.into()),
            short_description: None,
            model_description: None,
            runner: RunnerInfo::named(runner_name),
            inputs: None,
            outputs: None,
        }
    }

    /// Parses a manifest from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::parse(text).map_err(|msg| Error::Manifest(msg).into())
    }

    /// Reads and parses a manifest file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Manifest(format!("{:?}: {}", path, e)))?;
        Self::parse(&text).map_err(|msg| Error::Manifest(format!("{:?}: {}", path, msg)).into())
    }

    /// Serializes the manifest back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Manifest(e.to_string()).into())
    }

    /// Checks invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(|msg| Error::Manifest(msg).into())
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let info: CartonInfo = toml::from_str(text).map_err(|e| e.to_string())?;
        info.check()?;
        Ok(info)
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.runner.runner_name.trim().is_empty() {
            return Err("runner.runner_name must not be empty".to_string());
        }

        for (kind, specs) in [("input", &self.inputs), ("output", &self.outputs)] {
            let mut seen = HashSet::new();
            for spec in specs.iter().flatten() {
                if !seen.insert(spec.name.as_str()) {
                    return Err(format!("duplicate {} name '{}'", kind, spec.name));
                }
            }
        }

        Ok(())
    }
}
