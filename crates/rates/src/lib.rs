//! Rate aggregation and staleness pipeline for fxgap
//!
//! This crate acquires two independently-sourced market rates, combines
//! peer-to-peer order book offers into one representative rate, derives the
//! gap metrics, and caches the result under a TTL with single-flight
//! refresh.
//!
//! # Core Components
//!
//! - [`sources`] - Upstream adapters for the official and peer-market rates
//! - [`book`] - Quantity-weighted aggregation of peer offers
//! - [`gap`] - Pure gap spread / purchasing power / recommendation engine
//! - [`monitor`] - Staleness-aware cache controller (single-flight refresh,
//!   manual override, stale fallback)
//! - [`store`] - Durable snapshot store (get/set byte interface)
//! - [`worker`] - Periodic refresh loop bound to process shutdown
//! - [`api`] - HTTP surface (feature `api`)
//!
//! # Key Invariants
//!
//! - A snapshot is immutable: every refresh produces a new one
//! - The derived percentages are always computed from the two rates in the
//!   same snapshot, never stored independently
//! - At most one upstream fetch sequence is in flight at a time; concurrent
//!   callers share its result
//! - A failed refresh never corrupts the last good snapshot
//!
//! # Feature Flags
//!
//! - `api` - Enable the axum HTTP surface
//! - `client` - Enable the reqwest-backed source implementations

pub mod book;
pub mod clock;
pub mod error;
pub mod gap;
pub mod monitor;
pub mod sources;
pub mod store;
pub mod types;
pub mod worker;

#[cfg(feature = "api")]
pub mod api;

// Re-export commonly used types
pub use error::{RateError, StorageError};
pub use monitor::RateMonitor;
pub use types::{GapMetrics, PeerOffer, RateReport, RateSnapshot, Recommendation, ServedFrom};
pub use worker::RefreshWorker;

// Source exports
pub use sources::official::{MockOfficialRateSource, OfficialRateSource};
pub use sources::peer::{MockPeerMarketSource, PeerMarketSource};

#[cfg(feature = "client")]
pub use sources::official::http::HttpOfficialRateSource;

#[cfg(feature = "client")]
pub use sources::peer::http::{HttpPeerMarketSource, PeerMarketEndpoint};

// Store exports
pub use store::file::FileSnapshotStore;
pub use store::memory::InMemorySnapshotStore;
pub use store::traits::SnapshotStore;

/// Result type for rate pipeline operations
pub type Result<T> = std::result::Result<T, RateError>;
