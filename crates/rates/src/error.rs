//! Error types for the rate pipeline

use thiserror::Error;

/// Which upstream provider an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Official,
    PeerMarket,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Official => write!(f, "official rate provider"),
            Provider::PeerMarket => write!(f, "peer market provider"),
        }
    }
}

/// Errors from the upstream sources and the aggregation pipeline.
///
/// `Clone` because a refresh cycle's result is shared between every caller
/// that attached to it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// Transport failure or non-success HTTP status
    #[error("{provider} is unavailable: {detail}")]
    Unavailable {
        provider: Provider,
        status: Option<u16>,
        detail: String,
    },

    /// The provider answered, but the rate was non-finite or non-positive
    #[error("{provider} returned an invalid rate value")]
    InvalidValue { provider: Provider },

    /// The response envelope did not have the expected shape
    #[error("{provider} response was malformed: {detail}")]
    Malformed { provider: Provider, detail: String },

    /// Every offer in the order book was filtered out
    #[error("order book contained no valid offers")]
    NoValidOffers,

    /// Bad input to a pure computation
    #[error("invalid input: {0}")]
    Validation(String),
}

impl RateError {
    pub fn unavailable(provider: Provider, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Unavailable {
            provider,
            status,
            detail: detail.into(),
        }
    }

    pub fn malformed(provider: Provider, detail: impl Into<String>) -> Self {
        Self::Malformed {
            provider,
            detail: detail.into(),
        }
    }
}

/// Errors from the durable snapshot store.
///
/// The cache controller treats these as non-fatal: they are logged and the
/// pipeline continues on in-memory state.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failure
    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted payload could not be encoded or decoded
    #[error("snapshot store codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Stored value was not valid UTF-8 text
    #[error("snapshot store holds non-text data for key {key}")]
    NotText { key: String },
}
