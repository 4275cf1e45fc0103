//! Command execution for the `carton` binary
//!
//! Each subcommand loads through a `Carton` and writes its report to the
//! given writer, so the binary passes stdout and tests pass a buffer.

use std::collections::HashMap;
use std::io::Write;
use anyhow::Result;
use tracing::debug;

use cli_interface::{Command, LoadArgs};
use common::error::Error;
use common::tensor::{Tensor, TensorMap};
use common::types::{DataType, Device};
use common::utils::format_shape;
use inference_engine::{LoadOpts, Model};
use model_manager::TensorSpec;

use crate::Carton;

/// Name of the input the `smoke` command feeds
pub const SMOKE_INPUT: &str = "a";

/// Shape of the `smoke` input
pub const SMOKE_SHAPE: [usize; 2] = [4, 5];

/// Runs one subcommand
pub async fn run(carton: &Carton, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Info { load, json } => {
            let model = load_model(carton, &load).await?;
            if json {
                let text = serde_json::to_string_pretty(model.info()).map_err(Error::from)?;
                writeln!(out, "{}", text)?;
            } else {
                write_info(out, &model)?;
            }
        }
        Command::Infer { load, inputs } => {
            let model = load_model(carton, &load).await?;
            let tensors = inputs
                .iter()
                .map(|spec| -> Result<(String, Tensor)> { Ok((spec.name.clone(), spec.to_tensor()?)) })
                .collect::<Result<TensorMap>>()?;
            write_outputs(out, &model.infer_with_inputs(tensors)?)?;
        }
        Command::Smoke { load } => {
            let model = load_model(carton, &load).await?;
            let inputs = TensorMap::from([(
                SMOKE_INPUT.to_string(),
                Tensor::arange(DataType::Int64, &SMOKE_SHAPE)?,
            )]);
            let outputs = model.infer_with_inputs(inputs)?;
            writeln!(out, "{} ({}) ok", model.name(), model.runner())?;
            write_outputs(out, &outputs)?;
        }
        Command::Runners => {
            for (name, version) in carton.registry().list() {
                writeln!(out, "{} {}", name, version)?;
            }
        }
    }

    Ok(())
}

/// Loads the model named by the shared load arguments
pub async fn load_model(carton: &Carton, args: &LoadArgs) -> Result<Model> {
    let opts = LoadOpts {
        override_runner_name: args.runner.clone(),
        override_required_framework_version: args.runner_version.clone(),
        override_runner_opts: if args.opts.is_empty() {
            None
        } else {
            Some(args.opts.iter().cloned().collect::<HashMap<_, _>>())
        },
        visible_device: args.device.as_deref().map(str::parse::<Device>).transpose()?,
    };
    debug!("Loading {} with {:?}", args.location, opts);

    carton.load(&args.location, opts).await
}

fn write_info(out: &mut impl Write, model: &Model) -> Result<()> {
    let info = model.info();
    writeln!(out, "name:    {}", model.name())?;
    writeln!(out, "runner:  {} {}", model.runner(), model.runner_version())?;
    writeln!(out, "device:  {}", model.device())?;
    if let Some(description) = &info.short_description {
        writeln!(out, "about:   {}", description)?;
    }
    write_specs(out, "inputs", info.inputs.as_deref())?;
    write_specs(out, "outputs", info.outputs.as_deref())
}

fn write_specs(out: &mut impl Write, label: &str, specs: Option<&[TensorSpec]>) -> Result<()> {
    match specs {
        None => writeln!(out, "{}: undeclared", label)?,
        Some(specs) => {
            writeln!(out, "{}:", label)?;
            for spec in specs {
                writeln!(out, "  {}: {} {}", spec.name, spec.dtype, spec.shape)?;
            }
        }
    }
    Ok(())
}

fn write_outputs(out: &mut impl Write, outputs: &TensorMap) -> Result<()> {
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    for name in names {
        let tensor = &outputs[name];
        writeln!(out, "{}: {} {}", name, tensor.dtype(), format_shape(tensor.shape()))?;
    }
    Ok(())
}
