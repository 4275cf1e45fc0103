//! Command-line definition
//!
//! Subcommands share `LoadArgs` for choosing the model, runner and device.

use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::inputs::{parse_input, parse_opt, InputSpec};
use common::types::RunnerOpt;

#[derive(Parser, Debug)]
#[command(name = "carton", version, about = "Load packaged models and run inference")]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "CARTON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directives, overriding the configured level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a model and print its description
    Info {
        #[command(flatten)]
        load: LoadArgs,

        /// Print the model description as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a model and run inference on generated inputs
    Infer {
        #[command(flatten)]
        load: LoadArgs,

        /// Input tensor as name=dtype[d0,d1,...]:zeros|ones|arange
        #[arg(long = "input", short = 'i', value_parser = parse_input)]
        inputs: Vec<InputSpec>,
    },

    /// Load a model and run it on a 4x5 int64 arange input named "a"
    Smoke {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// List registered runners
    Runners,
}

/// Arguments shared by every command that loads a model
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Model location: a directory, a file, or a file:// URI
    pub location: String,

    /// Runner to load the model with
    #[arg(long)]
    pub runner: Option<String>,

    /// Required framework version, e.g. ">=2.0"
    #[arg(long)]
    pub runner_version: Option<String>,

    /// Runner option as key=value; may be repeated
    #[arg(long = "opt", value_parser = parse_opt)]
    pub opts: Vec<(String, RunnerOpt)>,

    /// Device to load onto: cpu, gpu, gpu:N or a GPU UUID
    #[arg(long)]
    pub device: Option<String>,
}
