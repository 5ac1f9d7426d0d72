//! Configuration module.
//!
//! YAML-based configuration with validation and `${VAR}` environment
//! variable expansion for secrets.

mod app;
mod validation;

pub use app::{AdvisorConfig, AppConfig, DatabaseConfig, ProbeConfig, ServerConfig};
pub use validation::{expand_env_vars, ConfigError};
