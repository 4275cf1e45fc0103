//! Common utilities and types for Carton
//!
//! This crate provides shared functionality used across the Carton crates,
//! including the error type, tensors, device and runner option types, and
//! utility functions.

pub mod error;
pub mod tensor;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::Error;
pub use tensor::{Tensor, TensorMap};
pub use types::*;
