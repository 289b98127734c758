//! Shared types for the rate pipeline

use crate::error::RateError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default cache time-to-live in minutes; also the periodic refresh cadence
pub const DEFAULT_TTL_MINUTES: u64 = 30;

/// Number of top-ranked offers considered by the aggregator
pub const TOP_OFFER_COUNT: usize = 10;

/// Reference transaction amount in quoted-asset units; converted to fiat via
/// the official rate before being used as the order book filter
pub const REFERENCE_AMOUNT: f64 = 25.0;

/// Action suggested by the gap between the two markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// Purchasing power below 60%: the official dollar is cheap
    BuyOfficial,
    Neutral,
    /// Purchasing power above 90%: the two rates have almost converged
    SellParallel,
}

/// One sell offer from the peer-to-peer order book.
///
/// Ephemeral: consumed during aggregation, never stored. Values are taken
/// as-is from the upstream response; the aggregator is responsible for
/// skipping non-finite or non-positive entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerOffer {
    pub price: f64,
    pub quantity: f64,
}

/// Output of the gap computation engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapMetrics {
    pub gap_spread_pct: f64,
    pub purchasing_power_pct: f64,
    pub recommendation: Recommendation,
}

/// One observation of both markets plus the derived metrics.
///
/// Immutable once created; every refresh produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Official rate, rounded to cents
    pub official_rate: f64,
    /// Quantity-weighted peer market rate, rounded to cents
    pub parallel_rate: f64,
    /// Premium of the parallel market over the official rate, in percent
    pub gap_spread_pct: f64,
    /// Percentage of parallel-market value obtainable at the official rate
    pub purchasing_power_pct: f64,
    pub recommendation: Recommendation,
    /// When this snapshot was taken
    pub observed_at: DateTime<Utc>,
    /// Fiat amount the order book search was filtered by, if any
    pub parallel_amount_used: Option<f64>,
}

/// Where a served snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    /// Just fetched from both upstreams
    Fresh,
    /// Cached snapshot inside the TTL window, no network activity
    Cache,
    /// Previous snapshot served because the refresh failed
    Stale,
}

/// What the cache controller hands back to callers
#[derive(Debug, Clone, PartialEq)]
pub struct RateReport {
    pub snapshot: RateSnapshot,
    pub served_from: ServedFrom,
    /// When the served snapshot was committed
    pub refreshed_at: DateTime<Utc>,
    /// The refresh failure masked by a stale serve; `None` otherwise
    pub warning: Option<RateError>,
}

impl RateReport {
    /// When the served snapshot stops being trusted
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.refreshed_at + ttl
    }

    pub fn is_stale(&self) -> bool {
        self.served_from == ServedFrom::Stale
    }
}
