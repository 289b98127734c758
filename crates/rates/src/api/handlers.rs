//! API handlers for the rate monitor HTTP endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::models::*;
use crate::error::RateError;
use crate::gap;
use crate::monitor::RateMonitor;
use common::money::round_to_cents;

/// Shared state behind the router
pub struct ApiState {
    pub monitor: RateMonitor,
    pub service_name: String,
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service_name.clone(),
    })
}

/// Stateless gap computation over two caller-supplied rates
pub async fn compute_rates(
    Json(req): Json<ComputeRequest>,
) -> Result<Json<ComputeResponse>, (StatusCode, Json<ErrorResponse>)> {
    match gap::compute(req.official_rate, req.parallel_rate) {
        Ok(metrics) => Ok(Json(ComputeResponse {
            success: true,
            rates: SnapshotPayload {
                official_rate: round_to_cents(req.official_rate),
                parallel_rate: round_to_cents(req.parallel_rate),
                gap_spread_pct: metrics.gap_spread_pct,
                purchasing_power_pct: metrics.purchasing_power_pct,
                recommendation: metrics.recommendation,
                last_update: Utc::now(),
                parallel_amount_used: None,
            },
        })),
        Err(RateError::Validation(message)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("VALIDATION_ERROR", message)),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("INTERNAL_ERROR", e.to_string())),
        )),
    }
}

/// Snapshot served through the cache controller
pub async fn get_rates(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<RatesParams>,
) -> Result<Json<RatesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let result = if params.is_forced() {
        state.monitor.force_refresh().await
    } else {
        state.monitor.current().await
    };

    match result {
        Ok(report) => Ok(Json(RatesResponse::from_report(
            report,
            state.monitor.ttl(),
        ))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("UPSTREAM_UNAVAILABLE", e.to_string())),
        )),
    }
}
