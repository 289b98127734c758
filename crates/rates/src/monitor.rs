//! Staleness-aware cache controller
//!
//! [`RateMonitor`] decides, per request, whether to serve the cached
//! snapshot, attach the caller to a refresh that is already running, or
//! start a new refresh cycle. One cycle fetches both sources concurrently,
//! aggregates the order book, derives the gap metrics, commits the new
//! snapshot and persists it.
//!
//! Concurrency contract:
//!
//! - `RefreshState` sits behind a non-async mutex that is never held across
//!   an await, so check-and-set is atomic with respect to the executor.
//! - At most one upstream fetch sequence exists at a time. The in-flight
//!   cycle is a [`Shared`] future; every concurrent caller - manual or
//!   periodic - awaits the same one.
//! - A failed cycle never touches the last good snapshot.

use crate::book;
use crate::clock::{Clock, SystemClock};
use crate::error::{RateError, StorageError};
use crate::gap;
use crate::sources::{OfficialRateSource, PeerMarketSource};
use crate::store::SnapshotStore;
use crate::types::{
    RateReport, RateSnapshot, ServedFrom, DEFAULT_TTL_MINUTES, REFERENCE_AMOUNT,
};
use chrono::{DateTime, Duration, Utc};
use common::money::round_to_unit;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use observability::MonitorMetrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store key the monitor persists its state under
const SNAPSHOT_KEY: &str = "last_snapshot";

type SharedRefresh = Shared<BoxFuture<'static, Result<RateSnapshot, RateError>>>;

/// What gets written to the durable store: the snapshot plus the commit time
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSnapshot {
    snapshot: RateSnapshot,
    refreshed_at: DateTime<Utc>,
}

/// Process-wide refresh state, owned exclusively by the monitor
#[derive(Default)]
struct RefreshState {
    last_snapshot: Option<RateSnapshot>,
    last_refresh_at: Option<DateTime<Utc>>,
    manual_refresh_pending: bool,
    in_flight: Option<SharedRefresh>,
}

struct MonitorInner {
    official: Arc<dyn OfficialRateSource>,
    peer: Arc<dyn PeerMarketSource>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    metrics: MonitorMetrics,
    ttl: Duration,
    reference_amount: f64,
    state: Mutex<RefreshState>,
}

/// Cheaply cloneable handle to the cache controller.
///
/// Constructed once per monitored pair; clones share the same refresh state.
#[derive(Clone)]
pub struct RateMonitor {
    inner: Arc<MonitorInner>,
}

/// What the locked state decided for one request
enum Plan {
    Serve(RateSnapshot, DateTime<Utc>),
    Join(SharedRefresh),
    Start(SharedRefresh),
}

impl RateMonitor {
    /// Create a monitor with the system clock and default settings
    pub fn new(
        official: Arc<dyn OfficialRateSource>,
        peer: Arc<dyn PeerMarketSource>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self::with_settings(
            official,
            peer,
            store,
            Arc::new(SystemClock),
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        )
    }

    /// Create a monitor with explicit clock, TTL and reference amount
    pub fn with_settings(
        official: Arc<dyn OfficialRateSource>,
        peer: Arc<dyn PeerMarketSource>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        ttl_minutes: u64,
        reference_amount: f64,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                official,
                peer,
                store,
                clock,
                metrics: MonitorMetrics::new(),
                ttl: Duration::minutes(ttl_minutes as i64),
                reference_amount,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Cache time-to-live
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// The last committed snapshot, if any
    pub fn last_snapshot(&self) -> Option<RateSnapshot> {
        self.inner.state.lock().last_snapshot.clone()
    }

    /// Hydrate the cache from the durable store.
    ///
    /// Returns `true` when a snapshot was restored. Callers treat a storage
    /// failure as non-fatal: log it and start cold.
    pub async fn restore(&self) -> Result<bool, StorageError> {
        let Some(bytes) = self.inner.store.get(SNAPSHOT_KEY).await? else {
            return Ok(false);
        };
        let persisted: PersistedSnapshot = serde_json::from_slice(&bytes)?;

        let mut state = self.inner.state.lock();
        state.last_refresh_at = Some(persisted.refreshed_at);
        state.last_snapshot = Some(persisted.snapshot);
        drop(state);

        info!("Restored snapshot from durable store");
        Ok(true)
    }

    /// Serve the current rates, refreshing only when the cache is stale.
    ///
    /// Inside the TTL window this returns the cached snapshot with zero
    /// network activity.
    pub async fn current(&self) -> Result<RateReport, RateError> {
        self.drive().await
    }

    /// Serve the current rates, forcing a refresh regardless of freshness.
    ///
    /// A manual request arriving while a cycle is already in flight attaches
    /// to that cycle instead of starting another one.
    pub async fn force_refresh(&self) -> Result<RateReport, RateError> {
        self.inner.state.lock().manual_refresh_pending = true;
        self.drive().await
    }

    async fn drive(&self) -> Result<RateReport, RateError> {
        let inner = &self.inner;

        // Everything under the lock is synchronous: the decision and the
        // in-flight registration happen without a suspension point.
        let plan = {
            let mut state = inner.state.lock();

            if let Some(in_flight) = state.in_flight.clone() {
                // The running cycle also satisfies a pending manual request.
                state.manual_refresh_pending = false;
                Plan::Join(in_flight)
            } else {
                let manual = state.manual_refresh_pending;
                let fresh = match (&state.last_snapshot, state.last_refresh_at) {
                    (Some(snapshot), Some(at)) if inner.clock.now() - at < inner.ttl => {
                        Some((snapshot.clone(), at))
                    }
                    _ => None,
                };

                match (manual, fresh) {
                    (false, Some((snapshot, refreshed_at))) => Plan::Serve(snapshot, refreshed_at),
                    _ => {
                        state.manual_refresh_pending = false;
                        let cycle = refresh_cycle(Arc::clone(inner)).boxed().shared();
                        state.in_flight = Some(cycle.clone());
                        Plan::Start(cycle)
                    }
                }
            }
        };

        match plan {
            Plan::Serve(snapshot, refreshed_at) => {
                inner.metrics.record_cache_hit();
                debug!("Serving cached snapshot");
                Ok(RateReport {
                    snapshot,
                    served_from: ServedFrom::Cache,
                    refreshed_at,
                    warning: None,
                })
            }
            Plan::Join(cycle) => {
                inner.metrics.record_singleflight_join();
                debug!("Attaching to in-flight refresh");
                self.await_cycle(cycle).await
            }
            Plan::Start(cycle) => self.await_cycle(cycle).await,
        }
    }

    async fn await_cycle(&self, cycle: SharedRefresh) -> Result<RateReport, RateError> {
        match cycle.await {
            Ok(snapshot) => Ok(RateReport {
                refreshed_at: snapshot.observed_at,
                snapshot,
                served_from: ServedFrom::Fresh,
                warning: None,
            }),
            Err(error) => {
                // Stale-but-available beats no data at all.
                let fallback = {
                    let state = self.inner.state.lock();
                    state.last_snapshot.clone().zip(state.last_refresh_at)
                };
                match fallback {
                    Some((snapshot, refreshed_at)) => {
                        self.inner.metrics.record_stale_serve();
                        warn!(%error, "Refresh failed, serving stale snapshot");
                        Ok(RateReport {
                            snapshot,
                            served_from: ServedFrom::Stale,
                            refreshed_at,
                            warning: Some(error),
                        })
                    }
                    None => Err(error),
                }
            }
        }
    }
}

/// One full refresh cycle. Runs inside the shared in-flight future.
async fn refresh_cycle(inner: Arc<MonitorInner>) -> Result<RateSnapshot, RateError> {
    // The order book filter comes from the previous official rate, so both
    // sources can still be fetched concurrently. First cycle runs unfiltered.
    let filter_amount = {
        let state = inner.state.lock();
        state
            .last_snapshot
            .as_ref()
            .map(|snapshot| round_to_unit(inner.reference_amount * snapshot.official_rate))
    };

    debug!(?filter_amount, "Refresh cycle starting");

    let result = match tokio::try_join!(
        inner.official.fetch_rate(),
        inner.peer.fetch_offers(filter_amount),
    ) {
        Ok((official_rate, offers)) => {
            book::representative_rate(&offers).and_then(|parallel_rate| {
                gap::compute(official_rate, parallel_rate).map(|metrics| RateSnapshot {
                    official_rate,
                    parallel_rate,
                    gap_spread_pct: metrics.gap_spread_pct,
                    purchasing_power_pct: metrics.purchasing_power_pct,
                    recommendation: metrics.recommendation,
                    observed_at: inner.clock.now(),
                    parallel_amount_used: filter_amount,
                })
            })
        }
        Err(error) => Err(error),
    };

    match result {
        Ok(snapshot) => {
            {
                let mut state = inner.state.lock();
                state.last_snapshot = Some(snapshot.clone());
                state.last_refresh_at = Some(snapshot.observed_at);
                state.in_flight = None;
            }
            inner.metrics.record_refresh_ok();
            info!(
                official = snapshot.official_rate,
                parallel = snapshot.parallel_rate,
                gap = snapshot.gap_spread_pct,
                "Rates refreshed"
            );

            if let Err(error) = persist(&inner, &snapshot).await {
                warn!(%error, "Failed to persist snapshot, continuing on in-memory state");
            }

            Ok(snapshot)
        }
        Err(error) => {
            inner.state.lock().in_flight = None;
            inner.metrics.record_refresh_error();
            warn!(%error, "Refresh cycle failed");
            Err(error)
        }
    }
}

async fn persist(inner: &MonitorInner, snapshot: &RateSnapshot) -> Result<(), StorageError> {
    let record = PersistedSnapshot {
        snapshot: snapshot.clone(),
        refreshed_at: snapshot.observed_at,
    };
    let bytes = serde_json::to_vec(&record)?;
    inner.store.set(SNAPSHOT_KEY, bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Provider;
    use crate::sources::{MockOfficialRateSource, MockPeerMarketSource};
    use crate::store::InMemorySnapshotStore;
    use crate::types::{PeerOffer, Recommendation};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    fn offers() -> Vec<PeerOffer> {
        vec![
            PeerOffer {
                price: 50.0,
                quantity: 100.0,
            },
            PeerOffer {
                price: 52.0,
                quantity: 50.0,
            },
        ]
    }

    struct Harness {
        official: Arc<MockOfficialRateSource>,
        peer: Arc<MockPeerMarketSource>,
        store: Arc<InMemorySnapshotStore>,
        clock: Arc<ManualClock>,
        monitor: RateMonitor,
    }

    fn harness(official_rate: f64) -> Harness {
        let official = Arc::new(MockOfficialRateSource::new(official_rate));
        let peer = Arc::new(MockPeerMarketSource::new(offers()));
        let store = Arc::new(InMemorySnapshotStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let monitor = RateMonitor::with_settings(
            official.clone(),
            peer.clone(),
            store.clone(),
            clock.clone(),
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        );

        Harness {
            official,
            peer,
            store,
            clock,
            monitor,
        }
    }

    #[tokio::test]
    async fn test_first_request_fetches_and_derives() {
        let h = harness(40.0);

        let report = h.monitor.current().await.unwrap();

        assert_eq!(report.served_from, ServedFrom::Fresh);
        assert_eq!(report.snapshot.official_rate, 40.0);
        assert_eq!(report.snapshot.parallel_rate, 50.67);
        assert_eq!(report.snapshot.purchasing_power_pct, 78.94);
        assert_eq!(report.snapshot.recommendation, Recommendation::Neutral);
        // First cycle has no previous official rate to derive a filter from
        assert_eq!(report.snapshot.parallel_amount_used, None);
        assert_eq!(h.peer.last_filter(), Some(None));
    }

    #[tokio::test]
    async fn test_within_ttl_serves_cache_without_network() {
        let h = harness(40.0);

        h.monitor.current().await.unwrap();
        assert_eq!(h.official.call_count(), 1);

        h.clock.advance(Duration::minutes(29));
        let report = h.monitor.current().await.unwrap();

        assert_eq!(report.served_from, ServedFrom::Cache);
        assert_eq!(h.official.call_count(), 1);
        assert_eq!(h.peer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_past_ttl_triggers_refresh() {
        let h = harness(40.0);

        h.monitor.current().await.unwrap();
        h.clock.advance(Duration::minutes(31));

        let report = h.monitor.current().await.unwrap();

        assert_eq!(report.served_from, ServedFrom::Fresh);
        assert_eq!(h.official.call_count(), 2);
        assert_eq!(h.peer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_cycle_filters_by_previous_official_rate() {
        let h = harness(40.0);

        h.monitor.current().await.unwrap();
        h.clock.advance(Duration::minutes(31));
        h.monitor.current().await.unwrap();

        // 25 quoted units at the previous official rate of 40.0
        assert_eq!(h.peer.last_filter(), Some(Some(1000.0)));
        let snapshot = h.monitor.last_snapshot().unwrap();
        assert_eq!(snapshot.parallel_amount_used, Some(1000.0));
    }

    #[tokio::test]
    async fn test_manual_refresh_bypasses_ttl() {
        let h = harness(40.0);

        h.monitor.current().await.unwrap();
        h.clock.advance(Duration::minutes(1));

        let report = h.monitor.force_refresh().await.unwrap();

        assert_eq!(report.served_from, ServedFrom::Fresh);
        assert_eq!(h.official.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let h = harness(40.0);

        let (a, b) = tokio::join!(h.monitor.current(), h.monitor.current());

        assert_eq!(a.unwrap().snapshot, b.unwrap().snapshot);
        // Single-flight: exactly one upstream fetch sequence
        assert_eq!(h.official.call_count(), 1);
        assert_eq!(h.peer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_manual_refresh_attaches_to_in_flight_cycle() {
        let h = harness(40.0);

        let (a, b) = tokio::join!(h.monitor.current(), h.monitor.force_refresh());

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(h.official.call_count(), 1);

        // The satisfied manual request must not force another refresh later.
        let report = h.monitor.current().await.unwrap();
        assert_eq!(report.served_from, ServedFrom::Cache);
        assert_eq!(h.official.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_with_cache_serves_stale_with_warning() {
        let h = harness(40.0);

        let first = h.monitor.current().await.unwrap().snapshot;

        h.clock.advance(Duration::minutes(31));
        h.official.set_result(Err(RateError::unavailable(
            Provider::Official,
            Some(503),
            "maintenance window",
        )));

        let report = h.monitor.current().await.unwrap();

        assert_eq!(report.served_from, ServedFrom::Stale);
        assert_eq!(report.snapshot, first);
        assert_matches!(report.warning, Some(RateError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_a_hard_error() {
        let h = harness(40.0);
        h.official.set_result(Err(RateError::unavailable(
            Provider::Official,
            None,
            "connection refused",
        )));

        assert_matches!(
            h.monitor.current().await,
            Err(RateError::Unavailable { .. })
        );
        // A later successful fetch recovers
        h.official.set_result(Ok(40.0));
        assert!(h.monitor.current().await.is_ok());
    }

    #[tokio::test]
    async fn test_one_failing_source_fails_the_whole_cycle() {
        let h = harness(40.0);
        h.peer
            .set_result(Err(RateError::malformed(Provider::PeerMarket, "code 000002")));

        let result = h.monitor.current().await;

        assert!(result.is_err());
        // No partial snapshot was committed
        assert!(h.monitor.last_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_all_invalid_offers_fail_the_cycle() {
        let h = harness(40.0);
        h.peer.set_result(Ok(vec![
            PeerOffer {
                price: 50.0,
                quantity: 0.0,
            },
            PeerOffer {
                price: 52.0,
                quantity: 0.0,
            },
        ]));

        assert_matches!(h.monitor.current().await, Err(RateError::NoValidOffers));
    }

    #[tokio::test]
    async fn test_snapshot_is_persisted_after_refresh() {
        let h = harness(40.0);

        h.monitor.current().await.unwrap();

        let bytes = h.store.get(SNAPSHOT_KEY).await.unwrap().unwrap();
        let persisted: PersistedSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(persisted.snapshot.official_rate, 40.0);
        assert_eq!(persisted.refreshed_at, persisted.snapshot.observed_at);
    }

    #[tokio::test]
    async fn test_restore_hydrates_the_cache() {
        let h = harness(40.0);
        h.monitor.current().await.unwrap();

        // A second monitor over the same store starts warm
        let official = Arc::new(MockOfficialRateSource::new(41.0));
        let peer = Arc::new(MockPeerMarketSource::new(offers()));
        let restored = RateMonitor::with_settings(
            official.clone(),
            peer,
            h.store.clone(),
            h.clock.clone(),
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        );

        assert!(restored.restore().await.unwrap());

        let report = restored.current().await.unwrap();
        assert_eq!(report.served_from, ServedFrom::Cache);
        assert_eq!(report.snapshot.official_rate, 40.0);
        assert_eq!(official.call_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_with_empty_store_starts_cold() {
        let h = harness(40.0);
        assert!(!h.monitor.restore().await.unwrap());
        assert!(h.monitor.last_snapshot().is_none());
    }

    /// Store that fails every write
    struct FailingStore;

    #[async_trait]
    impl SnapshotStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "disk on fire",
            )))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_the_refresh() {
        let official = Arc::new(MockOfficialRateSource::new(40.0));
        let peer = Arc::new(MockPeerMarketSource::new(offers()));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let monitor = RateMonitor::with_settings(
            official,
            peer,
            Arc::new(FailingStore),
            clock,
            DEFAULT_TTL_MINUTES,
            REFERENCE_AMOUNT,
        );

        let report = monitor.current().await.unwrap();
        assert_eq!(report.served_from, ServedFrom::Fresh);
        assert!(monitor.last_snapshot().is_some());
    }
}
