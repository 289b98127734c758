//! Prometheus metrics infrastructure
//!
//! [`init_metrics`] starts the exporter; [`MonitorMetrics`] is the metric
//! set recorded by the rate monitor. Handles are created once and cloned
//! into whoever needs to record.

use metrics::{counter, Counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on the given port exposing `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Metric set for the rate monitor
///
/// # Metrics
///
/// * `monitor_refresh_total{outcome}` - Refresh cycles by outcome (`ok` / `error`)
/// * `monitor_cache_hits_total` - Requests answered from the fresh cache
/// * `monitor_stale_serves_total` - Requests answered with a stale snapshot
///   after a failed refresh
/// * `monitor_singleflight_joins_total` - Callers that attached to an
///   already-running refresh cycle
#[derive(Clone)]
pub struct MonitorMetrics {
    refresh_ok: Counter,
    refresh_error: Counter,
    cache_hits: Counter,
    stale_serves: Counter,
    singleflight_joins: Counter,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self {
            refresh_ok: counter!("monitor_refresh_total", "outcome" => "ok"),
            refresh_error: counter!("monitor_refresh_total", "outcome" => "error"),
            cache_hits: counter!("monitor_cache_hits_total"),
            stale_serves: counter!("monitor_stale_serves_total"),
            singleflight_joins: counter!("monitor_singleflight_joins_total"),
        }
    }

    pub fn record_refresh_ok(&self) {
        self.refresh_ok.increment(1);
    }

    pub fn record_refresh_error(&self) {
        self.refresh_error.increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.increment(1);
    }

    pub fn record_stale_serve(&self) {
        self.stale_serves.increment(1);
    }

    pub fn record_singleflight_join(&self) {
        self.singleflight_joins.increment(1);
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
