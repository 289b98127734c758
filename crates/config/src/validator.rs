//! Configuration validation
//!
//! Validation never fails fast: all problems are collected into a
//! [`ValidationReport`] so the operator sees everything wrong with a file
//! in one pass. Errors block startup; warnings do not.

use crate::substitution::has_unresolved_env_vars;
use crate::{defaults, MonitorConfig};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("official_source.url is required")]
    MissingOfficialUrl,

    #[error("peer_source.url is required")]
    MissingPeerUrl,

    #[error("{field} contains an unresolved environment variable placeholder")]
    UnresolvedEnvVar { field: String },

    #[error("{field} must be an http(s) URL, got: {value}")]
    InvalidUrlScheme { field: String, value: String },

    #[error("monitor.refresh_ttl_minutes must be a positive integer")]
    InvalidTtl,

    #[error("monitor.reference_amount must be a positive number")]
    InvalidReferenceAmount,

    #[error("peer_source.rows must be between 1 and 20")]
    InvalidRows,

    #[error("{field} timeout must be a positive integer")]
    InvalidTimeout { field: String },

    #[error("peer_source.fiat and peer_source.asset must not be empty")]
    MissingPair,

    #[error("storage.snapshot_path must not be empty")]
    MissingSnapshotPath,

    #[error("server.log_format must be one of: pretty, json, compact")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

/// Result of validating a [`MonitorConfig`]
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn note_default(&mut self, field: &str, value: impl Into<String>) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.into(),
        });
    }
}

/// Validate a configuration, collecting every problem into one report
pub fn validate_config(config: &MonitorConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_url(
        &mut report,
        "official_source.url",
        &config.official_source.url,
        ValidationError::MissingOfficialUrl,
    );
    validate_url(
        &mut report,
        "peer_source.url",
        &config.peer_source.url,
        ValidationError::MissingPeerUrl,
    );

    if config.monitor.refresh_ttl_minutes == 0 {
        report.errors.push(ValidationError::InvalidTtl);
    } else if config.monitor.refresh_ttl_minutes < 5 {
        report.warn(
            "monitor.refresh_ttl_minutes",
            "refresh intervals under 5 minutes risk upstream rate limiting",
        );
    }

    if !(config.monitor.reference_amount.is_finite() && config.monitor.reference_amount > 0.0) {
        report.errors.push(ValidationError::InvalidReferenceAmount);
    } else if config.monitor.reference_amount.fract() != 0.0 {
        report.warn(
            "monitor.reference_amount",
            "fractional amounts are rounded to a whole unit before hitting the order book filter",
        );
    }

    if config.peer_source.rows == 0 || config.peer_source.rows > 20 {
        report.errors.push(ValidationError::InvalidRows);
    }

    if config.peer_source.fiat.trim().is_empty() || config.peer_source.asset.trim().is_empty() {
        report.errors.push(ValidationError::MissingPair);
    }

    if config.official_source.timeout_seconds == 0 {
        report.errors.push(ValidationError::InvalidTimeout {
            field: "official_source.timeout_seconds".to_string(),
        });
    }
    if config.peer_source.timeout_seconds == 0 {
        report.errors.push(ValidationError::InvalidTimeout {
            field: "peer_source.timeout_seconds".to_string(),
        });
    }

    if config.storage.snapshot_path.trim().is_empty() {
        report.errors.push(ValidationError::MissingSnapshotPath);
    }

    match config.server.log_format.to_lowercase().as_str() {
        "pretty" | "json" | "compact" => {}
        other => {
            report
                .errors
                .push(ValidationError::InvalidLogFormat(other.to_string()));
        }
    }

    if config.official_source.url == defaults::official_url() {
        report.note_default("official_source.url", &config.official_source.url);
    }
    if config.peer_source.url == defaults::peer_url() {
        report.note_default("peer_source.url", &config.peer_source.url);
    }

    report
}

fn validate_url(
    report: &mut ValidationReport,
    field: &str,
    value: &str,
    missing: ValidationError,
) {
    if value.trim().is_empty() {
        report.errors.push(missing);
        return;
    }
    if has_unresolved_env_vars(value) {
        report.errors.push(ValidationError::UnresolvedEnvVar {
            field: field.to_string(),
        });
        return;
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        report.errors.push(ValidationError::InvalidUrlScheme {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
