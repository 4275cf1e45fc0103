//! Command-line interface for Carton
//!
//! This crate defines the `carton` command line: argument parsing and the
//! small text formats used to pass runner options and input tensors.

pub mod cli;
pub mod inputs;

// Re-export commonly used types
pub use cli::{Cli, Command, LoadArgs};
pub use inputs::{parse_input, parse_opt, Fill, InputSpec};
