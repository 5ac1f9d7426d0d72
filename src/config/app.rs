//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{expand_env_vars, ConfigError};

// =============================================================================
// Constants
// =============================================================================

/// Default number of probe samples per run.
pub const DEFAULT_SAMPLES: u32 = 5;

/// Upper bound on per-run sample counts.
pub const DEFAULT_MAX_SAMPLES: u32 = 20;

/// Default per-request probe timeout (10 seconds).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default advisor request timeout (30 seconds).
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(30);

fn default_samples() -> u32 {
    DEFAULT_SAMPLES
}

fn default_max_samples() -> u32 {
    DEFAULT_MAX_SAMPLES
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_advisor_timeout() -> Duration {
    DEFAULT_ADVISOR_TIMEOUT
}

fn default_advisor_api_url() -> String {
    crate::advisor::DEFAULT_API_URL.to_string()
}

fn default_advisor_model() -> String {
    crate::advisor::DEFAULT_MODEL.to_string()
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:apipulse.db?mode=rwc".to_string(),
        }
    }
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Probe runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Samples per run when the request doesn't override it (default: 5).
    #[serde(default = "default_samples")]
    pub samples: u32,

    /// Upper bound on per-run sample counts (default: 20).
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,

    /// Per-request timeout (default: 10s).
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            max_samples: DEFAULT_MAX_SAMPLES,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

// =============================================================================
// Advisor Configuration
// =============================================================================

/// Tips advisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Enable the advisor (default: false). When disabled, runs are persisted
    /// without tips.
    #[serde(default)]
    pub enabled: bool,

    /// API base URL.
    #[serde(default = "default_advisor_api_url")]
    pub api_url: String,

    /// API key; supports `${VAR}` environment expansion.
    #[serde(default)]
    pub api_key: String,

    /// Model name.
    #[serde(default = "default_advisor_model")]
    pub model: String,

    /// Request timeout (default: 30s).
    #[serde(default = "default_advisor_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_advisor_api_url(),
            api_key: String::new(),
            model: default_advisor_model(),
            timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }
}

impl AdvisorConfig {
    /// API key with environment variables expanded.
    pub fn resolved_api_key(&self) -> String {
        expand_env_vars(&self.api_key)
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server configuration.
    pub server: ServerConfig,

    /// Database configuration.
    pub database: DatabaseConfig,

    /// Probe runner configuration.
    pub probe: ProbeConfig,

    /// Tips advisor configuration.
    pub advisor: AdvisorConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.probe.samples == 0 {
            return Err(ConfigError::ValidationError(
                "probe samples must be positive".to_string(),
            ));
        }

        if self.probe.samples > self.probe.max_samples {
            return Err(ConfigError::ValidationError(format!(
                "probe samples ({}) exceeds max_samples ({})",
                self.probe.samples, self.probe.max_samples
            )));
        }

        if self.probe.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "probe timeout must be non-zero".to_string(),
            ));
        }

        if self.advisor.enabled && self.advisor.resolved_api_key().is_empty() {
            return Err(ConfigError::ValidationError(
                "advisor is enabled but api_key resolves to empty".to_string(),
            ));
        }

        Ok(())
    }
}
