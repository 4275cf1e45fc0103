//! Common types for Carton
//!
//! This module defines the device, runner option and data type vocabulary
//! shared by the loader, the runners and the command-line interface.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hardware execution target requested for a loaded model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    /// Host CPU
    Cpu,
    /// A GPU, optionally pinned to a particular card
    Gpu(GpuSelector),
}

/// Which GPU a model should be placed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpuSelector {
    /// Any visible GPU
    Any,
    /// GPU by ordinal
    Index(u32),
    /// GPU by UUID (`GPU-...` or `MIG-GPU-...`)
    Uuid(String),
}

impl Device {
    /// Returns true if this is the CPU
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu(GpuSelector::Any) => write!(f, "gpu"),
            Device::Gpu(GpuSelector::Index(i)) => write!(f, "gpu:{}", i),
            Device::Gpu(GpuSelector::Uuid(uuid)) => write!(f, "{}", uuid),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // UUIDs keep their case
        if trimmed.starts_with("GPU-") || trimmed.starts_with("MIG-GPU-") {
            return Ok(Device::Gpu(GpuSelector::Uuid(trimmed.to_string())));
        }

        let lower = trimmed.to_lowercase();
        match lower.as_str() {
            "cpu" => return Ok(Device::Cpu),
            "gpu" | "cuda" => return Ok(Device::Gpu(GpuSelector::Any)),
            _ => {}
        }

        let index = lower
            .strip_prefix("gpu:")
            .or_else(|| lower.strip_prefix("cuda:"))
            .unwrap_or(&lower);

        index
            .parse::<u32>()
            .map(|i| Device::Gpu(GpuSelector::Index(i)))
            .map_err(|_| Error::InvalidArgument(format!("Unknown device: {}", s)))
    }
}

/// A single runner option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunnerOpt {
    /// Boolean flag
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Double(f64),
    /// Free-form string
    String(String),
}

impl RunnerOpt {
    /// Returns the string value, if this is a string option
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RunnerOpt::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer option
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RunnerOpt::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for RunnerOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerOpt::Boolean(b) => write!(f, "{}", b),
            RunnerOpt::Integer(i) => write!(f, "{}", i),
            RunnerOpt::Double(d) => write!(f, "{}", d),
            RunnerOpt::String(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for RunnerOpt {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(b) = s.parse::<bool>() {
            return Ok(RunnerOpt::Boolean(b));
        }
        if let Ok(i) = s.parse::<i64>() {
            return Ok(RunnerOpt::Integer(i));
        }
        if let Ok(d) = s.parse::<f64>() {
            return Ok(RunnerOpt::Double(d));
        }
        Ok(RunnerOpt::String(s.to_string()))
    }
}

/// Element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float16,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    String,
}

impl DataType {
    /// All supported data types
    pub const ALL: [DataType; 12] = [
        DataType::Float16,
        DataType::Float32,
        DataType::Float64,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::String,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == lower)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown data type: {}", s)))
    }
}
