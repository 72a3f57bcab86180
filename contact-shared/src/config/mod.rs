//! # Configuration
//!
//! Environment loading, schema validation, and the derived database
//! descriptor. The flow is strictly load → validate → construct: the raw
//! [`EnvProfile`] is consumed by [`Config::from_profile`] and never outlives it.

pub mod database;
pub mod env_loader;
pub mod error;
pub mod server;

#[cfg(test)]
#[allow(unsafe_code)]
mod integration_tests;

pub use database::{DatabaseDescriptor, NamingStrategy};
pub use env_loader::{EnvLoader, EnvProfile, resolve_environment_name};
pub use error::{ConfigError, Constraint, FieldError};
pub use server::{Config, LogFormat};
