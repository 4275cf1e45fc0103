//! Runner version requirements
//!
//! Combines what a manifest asks for with the caller's overrides into a
//! single requirement that registered runners are matched against.

use std::fmt;
use anyhow::Result;
use semver::{Version, VersionReq};

use common::error::Error;

use crate::metadata::RunnerInfo;

/// Parses an optional version requirement; `None` accepts any version
pub fn parse_version_req(req: Option<&str>) -> Result<VersionReq> {
    match req {
        None => Ok(VersionReq::STAR),
        Some(s) => VersionReq::parse(s.trim()).map_err(|e| {
            Error::InvalidArgument(format!("invalid runner version requirement '{}': {}", s, e)).into()
        }),
    }
}

/// What a model needs from a runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerRequirement {
    /// Runner identifier
    pub name: String,

    /// Acceptable framework versions
    pub version: VersionReq,

    /// Required runner interface version, if pinned
    pub compat_version: Option<u64>,
}

impl RunnerRequirement {
    /// Requirement exactly as the manifest states it
    pub fn from_info(info: &RunnerInfo) -> Self {
        Self {
            name: info.runner_name.clone(),
            version: info.required_framework_version.clone(),
            compat_version: info.runner_compat_version,
        }
    }

    /// Applies caller overrides
    ///
    /// Switching to a different runner name drops the manifest's version and
    /// compat constraints, since those describe the original runner.
    pub fn with_overrides(mut self, name: Option<&str>, version: Option<VersionReq>) -> Self {
        if let Some(name) = name {
            if name != self.name {
                self.name = name.to_string();
                self.version = VersionReq::STAR;
                self.compat_version = None;
            }
        }
        if let Some(version) = version {
            self.version = version;
        }
        self
    }

    /// Returns true if the requirement's version constraint accepts `version`
    pub fn accepts_version(&self, version: &Version) -> bool {
        self.version.matches(version)
    }

    /// Returns true if the requirement's compat constraint accepts `compat`
    pub fn accepts_compat(&self, compat: u64) -> bool {
        self.compat_version.map_or(true, |required| required == compat)
    }
}

impl fmt::Display for RunnerRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)?;
        if let Some(compat) = self.compat_version {
            write!(f, " compat {}", compat)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_req() {
        assert_eq!(parse_version_req(None).unwrap(), VersionReq::STAR);
        assert!(parse_version_req(Some("^1.2")).unwrap().matches(&Version::new(1, 4, 0)));

        let err = parse_version_req(Some("not a version")).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_overrides() {
        let info = RunnerInfo {
            runner_name: "torchscript".to_string(),
            required_framework_version: VersionReq::parse(">=2.0").unwrap(),
            runner_compat_version: Some(1),
            opts: None,
        };

        let same = RunnerRequirement::from_info(&info).with_overrides(Some("torchscript"), None);
        assert_eq!(same.version, info.required_framework_version);
        assert_eq!(same.compat_version, Some(1));

        let switched = RunnerRequirement::from_info(&info).with_overrides(Some("identity"), None);
        assert_eq!(switched.name, "identity");
        assert_eq!(switched.version, VersionReq::STAR);
        assert!(switched.accepts_compat(7));

        let pinned = RunnerRequirement::from_info(&info)
            .with_overrides(None, Some(VersionReq::parse("=2.1.0").unwrap()));
        assert!(pinned.accepts_version(&Version::new(2, 1, 0)));
        assert!(!pinned.accepts_version(&Version::new(2, 2, 0)));
        assert!(!pinned.accepts_compat(2));
        assert_eq!(pinned.to_string(), "torchscript (=2.1.0) compat 1");
    }
}
