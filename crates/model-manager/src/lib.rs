//! Model manifests and location resolution for Carton
//!
//! This crate knows how a model is described on disk (`carton.toml`), how a
//! caller-supplied location is turned into a model path, and how runner
//! version requirements are expressed.

pub mod loader;
pub mod metadata;
pub mod versioning;

// Re-export commonly used types
pub use loader::{ModelLoader, ResolvedModel};
pub use metadata::{CartonInfo, Dimension, RunnerInfo, Shape, TensorSpec, MANIFEST_FILE};
pub use versioning::{parse_version_req, RunnerRequirement};
