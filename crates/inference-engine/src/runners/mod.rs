//! Runners shipped with Carton

pub mod identity;

pub use identity::IdentityRunner;
