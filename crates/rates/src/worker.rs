//! Periodic refresh worker
//!
//! Re-enters the cache controller once per TTL interval while the process
//! is up. The first tick fires immediately, which primes the cache at
//! startup. A failed cycle is logged and simply recurs on the next tick;
//! there is deliberately no retry in between, so a struggling upstream is
//! never hammered.

use crate::monitor::RateMonitor;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task driving the monitor on a fixed cadence
pub struct RefreshWorker {
    monitor: RateMonitor,
    interval: Duration,
}

impl RefreshWorker {
    pub fn new(monitor: RateMonitor, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    /// Run until the shutdown token fires
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Refresh worker starting"
        );

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.monitor.current().await {
                        Ok(report) => {
                            debug!(served_from = ?report.served_from, "Periodic refresh completed");
                        }
                        Err(error) => {
                            warn!(%error, "Periodic refresh failed, retrying on next tick");
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Refresh worker shutting down");
                    return;
                }
            }
        }
    }
}
