//! Configuration module for sitepipe
//!
//! Provides types and parsing for `sitepipe.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, load_project, ConfigError, LoadedConfig};
pub use schema::*;
