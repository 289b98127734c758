//! Configuration parsing and validation for fxgap
//!
//! Configuration is a single YAML document describing the monitor, the two
//! upstream rate sources, the snapshot store and the HTTP server. Loading
//! goes through three stages:
//!
//! 1. Read the file and substitute `${ENV_VAR}` placeholders ([`substitution`])
//! 2. Deserialize into [`MonitorConfig`] (missing fields take defaults)
//! 3. Validate with [`validate_config`], which produces a [`ValidationReport`]
//!    instead of failing on the first problem
//!
//! # Example
//!
//! ```ignore
//! let config = config::load_config("fxgap.yaml")?;
//! let report = config::validate_config(&config);
//! if !report.is_valid() {
//!     // print report.errors and bail
//! }
//! ```

pub mod defaults;
pub mod substitution;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use substitution::substitute_env_vars;
pub use validator::{validate_config, ValidationError, ValidationReport};

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be written
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing failed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Top-level configuration for the fxgap service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Monitor behavior (TTL, reference amount)
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Official-rate provider
    #[serde(default)]
    pub official_source: OfficialSourceConfig,

    /// Peer-to-peer order book provider
    #[serde(default)]
    pub peer_source: PeerSourceConfig,

    /// Durable snapshot store
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerSection,
}

/// Monitor behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Service name used in logs and the health endpoint
    #[serde(default = "defaults::service_name")]
    pub name: String,

    /// Cache time-to-live in minutes; also the periodic refresh cadence
    #[serde(default = "defaults::refresh_ttl_minutes")]
    pub refresh_ttl_minutes: u64,

    /// Reference transaction amount in quoted-asset units, converted to the
    /// fiat currency via the official rate before being sent as the peer
    /// order book filter
    #[serde(default = "defaults::reference_amount")]
    pub reference_amount: f64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            name: defaults::service_name(),
            refresh_ttl_minutes: defaults::refresh_ttl_minutes(),
            reference_amount: defaults::reference_amount(),
        }
    }
}

/// Official-rate provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficialSourceConfig {
    /// Endpoint returning `{ "dollar": "<decimal string>" }`
    #[serde(default = "defaults::official_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::source_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for OfficialSourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::official_url(),
            timeout_seconds: defaults::source_timeout_seconds(),
        }
    }
}

/// Peer-to-peer order book provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSourceConfig {
    /// Order book search endpoint (POST)
    #[serde(default = "defaults::peer_url")]
    pub url: String,

    /// Fiat currency code of the monitored pair
    #[serde(default = "defaults::fiat")]
    pub fiat: String,

    /// Quoted asset code of the monitored pair
    #[serde(default = "defaults::asset")]
    pub asset: String,

    /// Number of top-ranked offers requested per search
    #[serde(default = "defaults::rows")]
    pub rows: u32,

    /// Request timeout in seconds
    #[serde(default = "defaults::source_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for PeerSourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::peer_url(),
            fiat: defaults::fiat(),
            asset: defaults::asset(),
            rows: defaults::rows(),
            timeout_seconds: defaults::source_timeout_seconds(),
        }
    }
}

/// Durable snapshot store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON snapshot file
    #[serde(default = "defaults::snapshot_path")]
    pub snapshot_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: defaults::snapshot_path(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Host to bind to
    #[serde(default = "defaults::host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "defaults::http_port")]
    pub http_port: u16,

    /// Optional Prometheus metrics port; metrics are disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Log output format: pretty, json or compact
    #[serde(default = "defaults::log_format")]
    pub log_format: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            http_port: defaults::http_port(),
            metrics_port: None,
            log_format: defaults::log_format(),
        }
    }
}

/// Load configuration from a YAML file, substituting `${ENV_VAR}` placeholders
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let substituted = substitute_env_vars(&raw);
    let config: MonitorConfig = serde_yaml::from_str(&substituted)?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Save configuration to a YAML file
pub fn save_config<P: AsRef<Path>>(config: &MonitorConfig, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Generate a configuration with all defaults applied
pub fn generate_default_config() -> MonitorConfig {
    MonitorConfig {
        monitor: MonitorSection::default(),
        official_source: OfficialSourceConfig::default(),
        peer_source: PeerSourceConfig::default(),
        storage: StorageConfig::default(),
        server: ServerSection::default(),
    }
}
