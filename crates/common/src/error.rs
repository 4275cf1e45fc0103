//! Error types for the common crate
//!
//! This module defines the error type shared by every Carton crate. Library
//! functions return `anyhow::Result` and raise these variants with `.into()`,
//! so callers can recover the kind with `downcast_ref::<Error>()`.

use thiserror::Error;

/// Common error type for Carton operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model manifest could not be read or is incomplete
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// No runner registered under the requested name
    #[error("Unknown runner: {0}")]
    UnknownRunner(String),

    /// Runner exists but no registered version satisfies the requirement
    #[error("Runner version unavailable: {0}")]
    RunnerVersion(String),

    /// Requested device cannot be served by any matching runner
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Inputs do not match the model's declared signature
    #[error("Signature mismatch: {0}")]
    Signature(String),

    /// Inference error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true if the error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if the error came from runner selection
    pub fn is_runner_selection(&self) -> bool {
        matches!(
            self,
            Error::UnknownRunner(_) | Error::RunnerVersion(_) | Error::DeviceUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_helpers() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::Timeout("x".into()).is_timeout());
        assert!(Error::RunnerVersion("x".into()).is_runner_selection());
        assert!(!Error::Signature("x".into()).is_runner_selection());
    }

    #[test]
    fn test_error_downcasts_through_anyhow() {
        let err: anyhow::Error = Error::UnknownRunner("torchscript".into()).into();
        let inner = err.downcast_ref::<Error>().unwrap();
        assert!(matches!(inner, Error::UnknownRunner(name) if name == "torchscript"));
        assert_eq!(err.to_string(), "Unknown runner: torchscript");
    }
}
