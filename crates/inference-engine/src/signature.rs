//! Input signature checks
//!
//! Compares the tensors a caller passes in against the inputs a model's
//! manifest declares. Symbolic dimensions bind on first use and every later
//! occurrence of the same symbol must agree.

use std::collections::HashMap;
use anyhow::Result;

use common::error::Error;
use common::tensor::TensorMap;
use common::utils::format_shape;
use model_manager::{Dimension, Shape, TensorSpec};

/// Checks `inputs` against the declared `specs`
pub fn validate_inputs(specs: &[TensorSpec], inputs: &TensorMap) -> Result<()> {
    for name in inputs.keys() {
        if !specs.iter().any(|spec| &spec.name == name) {
            return Err(Error::Signature(format!("unexpected input '{}'", name)).into());
        }
    }

    let mut bindings: HashMap<&str, usize> = HashMap::new();

    for spec in specs {
        let tensor = inputs
            .get(&spec.name)
            .ok_or_else(|| Error::Signature(format!("missing input '{}'", spec.name)))?;

        if tensor.dtype() != spec.dtype {
            return Err(Error::Signature(format!(
                "input '{}' has dtype {}, expected {}",
                spec.name,
                tensor.dtype(),
                spec.dtype
            ))
            .into());
        }

        let dims = match &spec.shape {
            Shape::Any => continue,
            Shape::Dims(dims) => dims,
        };

        let actual = tensor.shape();
        if actual.len() != dims.len() {
            return Err(Error::Signature(format!(
                "input '{}' has shape {}, expected {}",
                spec.name,
                format_shape(actual),
                spec.shape
            ))
            .into());
        }

        for (axis, (dim, &size)) in dims.iter().zip(actual).enumerate() {
            match dim {
                Dimension::Any => {}
                Dimension::Value(expected) => {
                    if size as u64 != *expected {
                        return Err(Error::Signature(format!(
                            "input '{}' has size {} on axis {}, expected {}",
                            spec.name, size, axis, expected
                        ))
                        .into());
                    }
                }
                Dimension::Symbol(symbol) => match bindings.get(symbol.as_str()) {
                    Some(&bound) if bound != size => {
                        return Err(Error::Signature(format!(
                            "input '{}' has size {} on axis {}, but '{}' is already {}",
                            spec.name, size, axis, symbol, bound
                        ))
                        .into());
                    }
                    Some(_) => {}
                    None => {
                        bindings.insert(symbol.as_str(), size);
                    }
                },
            }
        }
    }

    Ok(())
}
