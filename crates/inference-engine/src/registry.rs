//! Runner registry
//!
//! Runners are registered by name; several framework versions of the same
//! runner may be registered side by side. Resolution picks the newest
//! version that satisfies a `RunnerRequirement` and supports the device.

use std::sync::Arc;
use anyhow::Result;
use dashmap::DashMap;
use semver::Version;
use tracing::{debug, info, warn};

use common::error::Error;
use common::types::Device;
use model_manager::RunnerRequirement;

use crate::runner::Runner;
use crate::runners::IdentityRunner;

/// Registered runners, keyed by name
#[derive(Default)]
pub struct RunnerRegistry {
    /// Runner name -> registered versions
    runners: DashMap<String, Vec<Arc<dyn Runner>>>,
}

impl RunnerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            runners: DashMap::new(),
        }
    }

    /// Creates a registry holding the runners shipped with Carton
    pub fn with_builtin_runners() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(IdentityRunner::new()));
        registry
    }

    /// Registers a runner
    ///
    /// A runner with the same name and framework version replaces the
    /// previous registration.
    pub fn register(&self, runner: Arc<dyn Runner>) {
        let name = runner.name().to_string();
        let version = runner.framework_version();

        let mut entry = self.runners.entry(name.clone()).or_default();
        if let Some(pos) = entry.iter().position(|r| r.framework_version() == version) {
            warn!("Replacing registered runner {} {}", name, version);
            entry[pos] = runner;
        } else {
            info!("Registered runner {} {}", name, version);
            entry.push(runner);
        }
    }

    /// Returns true if any version of `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }

    /// Registered `(name, version)` pairs, sorted
    pub fn list(&self) -> Vec<(String, Version)> {
        let mut all: Vec<(String, Version)> = self
            .runners
            .iter()
            .flat_map(|entry| {
                let name = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .map(|r| (name.clone(), r.framework_version()))
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort();
        all
    }

    /// Picks the runner that should load a model
    pub fn resolve(&self, requirement: &RunnerRequirement, device: &Device) -> Result<Arc<dyn Runner>> {
        let candidates = self
            .runners
            .get(&requirement.name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownRunner(requirement.name.clone()))?;

        let matching: Vec<Arc<dyn Runner>> = candidates
            .into_iter()
            .filter(|r| {
                requirement.accepts_version(&r.framework_version())
                    && requirement.accepts_compat(r.compat_version())
            })
            .collect();

        if matching.is_empty() {
            return Err(Error::RunnerVersion(format!("no registered runner satisfies {}", requirement)).into());
        }

        let chosen = matching
            .into_iter()
            .filter(|r| r.supports_device(device))
            .max_by(|a, b| a.framework_version().cmp(&b.framework_version()))
            .ok_or_else(|| {
                Error::DeviceUnavailable(format!("{} cannot run on {}", requirement, device))
            })?;

        debug!(
            "Resolved {} to {} {} on {}",
            requirement,
            chosen.name(),
            chosen.framework_version(),
            device
        );

        Ok(chosen)
    }
}
