//! API models for the rate monitor HTTP endpoints

use crate::types::{RateReport, RateSnapshot, Recommendation, ServedFrom};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Request to compute gap metrics from two caller-supplied rates
#[derive(Debug, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub official_rate: f64,
    pub parallel_rate: f64,
}

/// Snapshot fields as they appear on the wire
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub official_rate: f64,
    pub parallel_rate: f64,
    pub gap_spread_pct: f64,
    pub purchasing_power_pct: f64,
    pub recommendation: Recommendation,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_amount_used: Option<f64>,
}

impl From<RateSnapshot> for SnapshotPayload {
    fn from(snapshot: RateSnapshot) -> Self {
        Self {
            official_rate: snapshot.official_rate,
            parallel_rate: snapshot.parallel_rate,
            gap_spread_pct: snapshot.gap_spread_pct,
            purchasing_power_pct: snapshot.purchasing_power_pct,
            recommendation: snapshot.recommendation,
            last_update: snapshot.observed_at,
            parallel_amount_used: snapshot.parallel_amount_used,
        }
    }
}

/// Response of `POST /api/v1/compute`
#[derive(Debug, Serialize, Deserialize)]
pub struct ComputeResponse {
    pub success: bool,
    pub rates: SnapshotPayload,
}

/// Query parameters of `GET /api/v1/rates`
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RatesParams {
    #[serde(default)]
    pub refresh: Option<String>,
}

impl RatesParams {
    /// Whether the caller asked for the manual-refresh path
    pub fn is_forced(&self) -> bool {
        self.refresh.as_deref() == Some("force")
    }
}

/// Response of `GET /api/v1/rates`
#[derive(Debug, Serialize, Deserialize)]
pub struct RatesResponse {
    pub success: bool,
    pub rates: SnapshotPayload,
    pub served_from: ServedFrom,
    /// When the served snapshot stops being trusted
    pub next_refresh_at: DateTime<Utc>,
    /// Set when a failed refresh was masked by a stale serve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RatesResponse {
    pub fn from_report(report: RateReport, ttl: Duration) -> Self {
        let next_refresh_at = report.expires_at(ttl);
        Self {
            success: true,
            served_from: report.served_from,
            next_refresh_at,
            warning: report.warning.map(|error| error.to_string()),
            rates: report.snapshot.into(),
        }
    }
}

/// Error detail
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
