//! Text formats for runner options and generated inputs
//!
//! Runner options are written `key=value`; the value is read as a boolean,
//! an integer, a float, or otherwise kept as a string. Inputs are written
//! `name=dtype[d0,d1,...]:fill` and describe a tensor to generate.

use std::fmt;
use std::str::FromStr;
use anyhow::{anyhow, Result};

use common::tensor::Tensor;
use common::types::{DataType, RunnerOpt};

/// How a generated tensor is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Zeros,
    Ones,
    /// 0, 1, 2, ... in row-major order
    Arange,
}

impl FromStr for Fill {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zeros" => Ok(Fill::Zeros),
            "ones" => Ok(Fill::Ones),
            "arange" => Ok(Fill::Arange),
            other => Err(anyhow!("unknown fill '{}', expected zeros, ones or arange", other)),
        }
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fill::Zeros => write!(f, "zeros"),
            Fill::Ones => write!(f, "ones"),
            Fill::Arange => write!(f, "arange"),
        }
    }
}

/// A tensor to generate from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub dtype: DataType,
    pub shape: Vec<usize>,
    pub fill: Fill,
}

impl InputSpec {
    /// Builds the tensor
    pub fn to_tensor(&self) -> Result<Tensor> {
        match self.fill {
            Fill::Zeros => Tensor::zeros(self.dtype, &self.shape),
            Fill::Ones => Tensor::filled(self.dtype, &self.shape, |_| 1.0),
            Fill::Arange => Tensor::arange(self.dtype, &self.shape),
        }
    }
}

/// Parses a `key=value` runner option
pub fn parse_opt(s: &str) -> Result<(String, RunnerOpt)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty option name in '{}'", s));
    }
    // RunnerOpt parsing cannot fail
    let value = match value.trim().parse::<RunnerOpt>() {
        Ok(v) => v,
        Err(never) => match never {},
    };
    Ok((key.to_string(), value))
}

/// Parses a `name=dtype[d0,d1,...]:fill` input description
///
/// The fill defaults to zeros and `[]` denotes a scalar.
pub fn parse_input(s: &str) -> Result<InputSpec> {
    let (name, rest) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=dtype[shape], got '{}'", s))?;
    if name.is_empty() {
        return Err(anyhow!("empty input name in '{}'", s));
    }

    let (tensor, fill) = match rest.rsplit_once(':') {
        Some((tensor, fill)) => (tensor, fill.parse()?),
        None => (rest, Fill::default()),
    };

    let open = tensor
        .find('[')
        .ok_or_else(|| anyhow!("missing shape in '{}'", s))?;
    let dims = tensor[open + 1..]
        .strip_suffix(']')
        .ok_or_else(|| anyhow!("unterminated shape in '{}'", s))?;

    let dtype: DataType = tensor[..open].parse()?;
    let shape = if dims.trim().is_empty() {
        Vec::new()
    } else {
        dims.split(',')
            .map(|d| {
                d.trim()
                    .parse::<usize>()
                    .map_err(|e| anyhow!("bad dimension '{}' in '{}': {}", d.trim(), s, e))
            })
            .collect::<Result<Vec<_>>>()?
    };

    if shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)).is_none() {
        return Err(anyhow!("shape of '{}' has too many elements", s));
    }

    Ok(InputSpec {
        name: name.to_string(),
        dtype,
        shape,
        fill,
    })
}
