//! Runner selection, model handles and inference execution for Carton
//!
//! Runners are pluggable framework backends registered in a
//! `RunnerRegistry`. The `InferenceEngine` resolves a model location, picks
//! a runner for the requested framework version and device, and returns a
//! `Model` that runs inference on named tensors.

pub mod engine;
pub mod model;
pub mod registry;
pub mod runner;
pub mod runners;
pub mod signature;

// Re-export commonly used types
pub use engine::{InferenceEngine, LoadOpts};
pub use model::{Model, SealHandle};
pub use registry::RunnerRegistry;
pub use runner::{LoadRequest, Runner, RunnerModel};
pub use runners::IdentityRunner;
