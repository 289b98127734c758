//! Upstream rate source adapters
//!
//! Each adapter owns one network call and the validation of its response.
//! Retry policy deliberately lives with the caller: a failed fetch simply
//! recurs on the next periodic or manual trigger.

pub mod official;
pub mod peer;

pub use official::{MockOfficialRateSource, OfficialRateSource};
pub use peer::{MockPeerMarketSource, PeerMarketSource};
