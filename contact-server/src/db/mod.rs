//! PostgreSQL connection and schema bootstrap.

pub mod bootstrap;
pub mod pool;
